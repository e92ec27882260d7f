//! Language code normalization.
//!
//! Codes are normalized to lowercase with `_` separators, then matched
//! against the supported list and an alternative-code table. Unmatched codes
//! fall back one subtag at a time, so `zh-HK` becomes `zh`, which maps to
//! `zh_cn`.

/// Supported UI languages, by normalized code.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "en", "en_gb", "fr", "it", "de", "es", "zh_cn", "zh_tw", "ja", "ko", "nl", "pl", "pt", "ru",
    "th", "tr", "bg", "ca", "hr", "cs", "da", "fil", "fi", "el", "hi", "hu", "id", "lv", "lt",
    "no", "pt_pt", "ro", "sr", "sk", "sl", "sv", "uk", "vi", "ar", "iw",
];

/// Alternative codes and the supported code each maps to.
const ALTERNATIVE_CODES: &[(&str, &str)] = &[
    ("en_us", "en"),
    ("zh", "zh_cn"),
    ("zh_hans", "zh_cn"),
    ("zh_hans_cn", "zh_cn"),
    ("zh_hant", "zh_tw"),
    ("zh_hant_tw", "zh_tw"),
    ("nl_nl", "nl"),
    ("fr_fr", "fr"),
    ("de_de", "de"),
    ("it_it", "it"),
    ("ja_jp", "ja"),
    ("ko_kr", "ko"),
    ("pl_pl", "pl"),
    ("pt_br", "pt"),
    ("ru_ru", "ru"),
    ("es_es", "es"),
    ("th_th", "th"),
    ("tr_tr", "tr"),
    ("bg_bg", "bg"),
    ("ca_es", "ca"),
    ("hr_hr", "hr"),
    ("cs_cz", "cs"),
    ("da_dk", "da"),
    ("fil_ph", "fil"),
    ("tl", "fil"),
    ("fi_fi", "fi"),
    ("el_gr", "el"),
    ("hi_in", "hi"),
    ("hu_hu", "hu"),
    ("id_id", "id"),
    ("lv_lv", "lv"),
    ("lt_lt", "lt"),
    ("no_no", "no"),
    ("nb", "no"),
    ("nb_no", "no"),
    ("ro_ro", "ro"),
    ("sr_cyrl_rs", "sr"),
    ("sk_sk", "sk"),
    ("sl_si", "sl"),
    ("sv_se", "sv"),
    ("uk_ua", "uk"),
    ("vi_vn", "vi"),
    ("ar_eg", "ar"),
    ("iw_il", "iw"),
    ("he", "iw"),
    ("he_il", "iw"),
];

/// Finds the supported code for `language`, or `None` if nothing matches.
#[must_use]
pub fn find_language_code(language: &str) -> Option<&'static str> {
    let mut lang = language.replace('-', "_").to_lowercase();
    while !lang.is_empty() {
        if let Some(code) = SUPPORTED_LANGUAGES.iter().find(|code| **code == lang) {
            return Some(code);
        }
        if let Some((_, code)) = ALTERNATIVE_CODES.iter().find(|(alt, _)| *alt == lang) {
            return Some(code);
        }
        match lang.rfind('_') {
            Some(pos) => lang.truncate(pos),
            None => lang.clear(),
        }
    }
    None
}

/// Returns `true` for Arabic and Hebrew.
#[must_use]
pub fn is_right_to_left(language: &str) -> bool {
    matches!(find_language_code(language), Some("ar" | "iw"))
}
