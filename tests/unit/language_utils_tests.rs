/*!
 * Tests for language code handling
 */

use slidelingo::language_utils::{get_language_name, is_auto, normalize_to_part2t, validate_language_code};

#[test]
fn test_normalizeToPart2t_withAllCodeForms_shouldAgree() {
    assert_eq!(normalize_to_part2t("fr").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t(" FRA ").unwrap(), "fra");
    assert!(normalize_to_part2t("zz").is_err());
}

#[test]
fn test_isAuto_shouldIgnoreCaseAndSpaces() {
    assert!(is_auto("auto"));
    assert!(is_auto(" AUTO "));
    assert!(!is_auto("en"));
}

#[test]
fn test_validateLanguageCode_withAuto_shouldFail() {
    assert!(validate_language_code("auto").is_err());
}

#[test]
fn test_getLanguageName_withCommonCodes_shouldReturnEnglishNames() {
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert_eq!(get_language_name("ger").unwrap(), "German");
    assert!(get_language_name("nope").is_err());
}
