//! PostScript glyph names for the characters PDF text may re-encode.

const LATIN1: [&str; 95] = [
    "exclamdown", "cent", "sterling", "currency", "yen", "brokenbar", "section", "dieresis",
    "copyright", "ordfeminine", "guillemotleft", "logicalnot", "hyphen", "registered", "macron",
    "degree", "plusminus", "twosuperior", "threesuperior", "acute", "mu", "paragraph",
    "periodcentered", "cedilla", "onesuperior", "ordmasculine", "guillemotright", "onequarter",
    "onehalf", "threequarters", "questiondown", "Agrave", "Aacute", "Acircumflex", "Atilde",
    "Adieresis", "Aring", "AE", "Ccedilla", "Egrave", "Eacute", "Ecircumflex", "Edieresis",
    "Igrave", "Iacute", "Icircumflex", "Idieresis", "Eth", "Ntilde", "Ograve", "Oacute",
    "Ocircumflex", "Otilde", "Odieresis", "multiply", "Oslash", "Ugrave", "Uacute", "Ucircumflex",
    "Udieresis", "Yacute", "Thorn", "germandbls", "agrave", "aacute", "acircumflex", "atilde",
    "adieresis", "aring", "ae", "ccedilla", "egrave", "eacute", "ecircumflex", "edieresis",
    "igrave", "iacute", "icircumflex", "idieresis", "eth", "ntilde", "ograve", "oacute",
    "ocircumflex", "otilde", "odieresis", "divide", "oslash", "ugrave", "uacute", "ucircumflex",
    "udieresis", "yacute", "thorn", "ydieresis",
];

const GREEK_UPPER: [&str; 25] = [
    "Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta", "Theta", "Iota", "Kappa",
    "Lambda", "Mu", "Nu", "Xi", "Omicron", "Pi", "Rho", "", "Sigma", "Tau", "Upsilon", "Phi",
    "Chi", "Psi", "Omega",
];

const GREEK_LOWER: [&str; 25] = [
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lambda", "mu", "nu", "xi", "omicron", "pi", "rho", "sigma1", "sigma", "tau", "upsilon",
    "phi", "chi", "psi", "omega",
];

pub fn glyph_name(c: char) -> String {
    let cp = c as u32;
    let named = match cp {
        0xa1..=0xff => Some(LATIN1[(cp - 0xa1) as usize]),
        0x391..=0x3a9 => Some(GREEK_UPPER[(cp - 0x391) as usize]).filter(|n| !n.is_empty()),
        0x3b1..=0x3c9 => Some(GREEK_LOWER[(cp - 0x3b1) as usize]),
        0x2013 => Some("endash"),
        0x2014 => Some("emdash"),
        0x2022 => Some("bullet"),
        0x2026 => Some("ellipsis"),
        0x20ac => Some("Euro"),
        0x2126 => Some("Omega"),
        0x2206 => Some("Delta"),
        0x221a => Some("radical"),
        0x221e => Some("infinity"),
        0x2248 => Some("approxequal"),
        0x2260 => Some("notequal"),
        0x2264 => Some("lessequal"),
        0x2265 => Some("greaterequal"),
        _ => None,
    };
    match named {
        Some(name) => name.to_string(),
        None if cp <= 0xffff => format!("uni{:04X}", cp),
        None => format!("u{:X}", cp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(glyph_name('é'), "eacute");
        assert_eq!(glyph_name('ÿ'), "ydieresis");
        assert_eq!(glyph_name('µ'), "mu");
        assert_eq!(glyph_name('Ω'), "Omega");
        assert_eq!(glyph_name('\u{3a2}'), "uni03A2");
        assert_eq!(glyph_name('→'), "uni2192");
    }
}
