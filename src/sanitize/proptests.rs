//! Property-based tests for the sanitization pipeline

use super::*;
use proptest::prelude::*;

fn arb_config() -> impl Strategy<Value = SanitizeConfig> {
    prop_oneof![
        Just(SanitizeConfig::pass_through()),
        Just(SanitizeConfig::default()),
    ]
}

fn arb_data_file_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("cuet_data.csv"), Just("links.csv"), Just("list.csv")]
}

/// Plain prose without markup, URLs or greetings
fn arb_plain() -> impl Strategy<Value = String> {
    "[a-z0-9 ,.!?]{0,40}"
}

proptest! {
    #[test]
    fn prop_never_fails(raw in any::<String>(), config in arb_config()) {
        let _ = sanitize(&raw, &config);
    }

    #[test]
    fn prop_data_file_names_never_leak(
        head in "[a-zA-Z0-9 ,.!?\n]{0,40}",
        name in arb_data_file_name(),
        tail in "[a-zA-Z0-9 ,.!?\n]{0,40}",
        config in arb_config(),
    ) {
        let out = sanitize(&format!("{head}{name}{tail}"), &config);
        prop_assert!(!out.contains("cuet_data.csv"));
        prop_assert!(!out.contains("links.csv"));
        prop_assert!(!out.contains("list.csv"));
    }

    #[test]
    fn prop_bold_markers_removed_inner_text_kept(
        before in arb_plain(),
        inner in "[a-z0-9 ]{1,30}",
        after in arb_plain(),
    ) {
        let out = sanitize(&format!("{before}**{inner}**{after}"), &SanitizeConfig::default());
        prop_assert_eq!(out, format!("{before}{inner}{after}"));
    }

    #[test]
    fn prop_canonicalized_links_keep_label(
        label in "[A-Za-z0-9 ]{1,20}",
        host in "[a-z]{1,12}",
        path in "[a-z0-9/]{0,12}",
    ) {
        let config = SanitizeConfig::default();
        let out = sanitize(&format!("[{label}](http://{host}.com/{path})"), &config);
        let expected_label = format!("[{label}](");
        let expected_href = format!(r#"href="{}""#, config.canonical_url);
        prop_assert!(out.starts_with(&expected_label));
        prop_assert!(out.contains(&expected_href));
        let model_url = format!("http://{host}.com");
        prop_assert!(!out.contains(&model_url));
    }

    #[test]
    fn prop_canonicalized_bare_urls_hidden(
        host in "[a-z]{1,12}",
        path in "[a-z0-9/]{0,12}",
    ) {
        let config = SanitizeConfig::default();
        let out = sanitize(&format!("see https://{host}.org/{path} ok"), &config);
        let model_url = format!("https://{host}.org");
        prop_assert!(!out.contains(&model_url));
        let expected_anchor_text = format!(">{}</a>", config.canonical_url);
        prop_assert!(out.contains(&expected_anchor_text));
    }

    #[test]
    fn prop_plain_text_untouched(text in arb_plain(), config in arb_config()) {
        prop_assert_eq!(sanitize(&text, &config), text);
    }
}
