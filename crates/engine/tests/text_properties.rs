//! Property tests for the text-level pipeline stages.
//!
//! Extraction must be total over arbitrary input and sanitizing must always
//! remove the export prefix. Run with:
//!
//!   cargo test -p canvas-studio-engine --test text_properties

use canvas_studio_engine::config::{Config, Position, MAX_DIMENSION};
use canvas_studio_engine::extract::{extract_config_detailed, ExtractOutcome};
use canvas_studio_engine::sanitize::{has_export_prefix, sanitize, sanitize_extracted};
use canvas_studio_engine::store::Store;
use canvas_studio_engine::{extract_config, RenderState, ViewportBounds};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Script-ish noise: braces, quotes, comment markers and fragments of the
/// declaration, so the scanner sees plenty of hostile combinations.
fn script_noise() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        Just("{".to_string()),
        Just("}".to_string()),
        Just("\"".to_string()),
        Just("'".to_string()),
        Just("`".to_string()),
        Just("//".to_string()),
        Just("/*".to_string()),
        Just("*/".to_string()),
        Just("[[".to_string()),
        Just("]=]".to_string()),
        Just("--".to_string()),
        Just("\n".to_string()),
        Just("export const config = {".to_string()),
        Just("export\tconst  config".to_string()),
        Just("canvasWidth: 10,".to_string()),
        Just("ctx:fillRect(0, 0, 5, 5)".to_string()),
        "[a-z0-9 :=,;\\[\\]]{0,8}",
    ];
    prop::collection::vec(piece, 0..40).prop_map(|parts| parts.concat())
}

fn position() -> impl Strategy<Value = Position> {
    prop::sample::select(Position::ALL.to_vec())
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn extraction_is_total(source in script_noise()) {
        let extraction = extract_config_detailed(&source);
        let config = extraction.config;
        prop_assert!(config.canvas_width >= 1 && config.canvas_width <= MAX_DIMENSION);
        prop_assert!(config.canvas_height >= 1 && config.canvas_height <= MAX_DIMENSION);
        if !extraction.outcome.is_extracted() {
            prop_assert_eq!(config, Config::default());
        }
    }

    #[test]
    fn extraction_is_total_on_arbitrary_unicode(source in "\\PC{0,200}") {
        let _ = extract_config(&source);
    }

    #[test]
    fn text_without_declaration_yields_defaults(source in "[^e]{0,200}") {
        let extraction = extract_config_detailed(&source);
        prop_assert_eq!(extraction.outcome, ExtractOutcome::Missing);
        prop_assert_eq!(extraction.config, Config::default());
    }

    #[test]
    fn sanitized_never_contains_prefix(source in script_noise()) {
        let out = sanitize(&source);
        prop_assert!(!has_export_prefix(&out));
        let extracted = sanitize_extracted(&source, &extract_config_detailed(&source));
        prop_assert!(!has_export_prefix(&extracted));
    }

    #[test]
    fn declared_values_round_trip(
        w in 1u32..=4096,
        h in 1u32..=4096,
        pos in position(),
        lua_syntax in any::<bool>(),
        trailer in "[a-z ();:\\n]{0,40}",
    ) {
        let sep = if lua_syntax { "=" } else { ":" };
        let source = format!(
            "export const config = {{ canvasWidth {sep} {w}, canvasHeight {sep} {h}, position {sep} '{}', }}\n{trailer}",
            pos.as_str()
        );
        let config = extract_config(&source);
        prop_assert_eq!(config.canvas_width, w);
        prop_assert_eq!(config.canvas_height, h);
        prop_assert_eq!(config.position, pos);
    }

    #[test]
    fn display_scale_never_magnifies(
        w in 1u32..=MAX_DIMENSION,
        h in 1u32..=MAX_DIMENSION,
        vw in 0.0f64..10_000.0,
        vh in 0.0f64..10_000.0,
        padding in 0.0f64..100.0,
    ) {
        let config = Config { canvas_width: w, canvas_height: h, ..Config::default() };
        let state = RenderState::compute(&config, ViewportBounds::new(vw, vh), padding);
        prop_assert!(state.display_scale >= 0.0 && state.display_scale <= 1.0);
        prop_assert_eq!(state, RenderState::compute(&config, ViewportBounds::new(vw, vh), padding));
    }

    #[test]
    fn store_derived_state_tracks_last_write(writes in prop::collection::vec(script_noise(), 1..8)) {
        let mut store = Store::new("");
        for text in &writes {
            store.write_source(text.clone());
            prop_assert_eq!(store.config(), &extract_config(text));
            let expected = sanitize_extracted(text, &extract_config_detailed(text));
            prop_assert_eq!(store.sanitized(), expected.as_ref());
        }
        prop_assert_eq!(store.source(), writes.last().unwrap().as_str());
    }
}
