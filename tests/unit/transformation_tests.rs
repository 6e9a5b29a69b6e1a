// Transformation compiler tests

use cloudinary::options::from_value;
use cloudinary::transformation::{
    generate_transformation_string, CanonicalParam, ParamKey, TransformationChain,
    TransformationSegment,
};
use cloudinary::Error;
use rstest::rstest;
use serde_json::{json, Value};

fn compile(options: Value) -> String {
    generate_transformation_string(from_value(options))
        .unwrap()
        .0
        .path
}

#[test]
fn test_codec_forms_compile_identically() {
    let from_map = compile(json!({"video_codec": {"codec": "h264", "profile": "basic", "level": "3.1"}}));
    let from_string = compile(json!({"video_codec": "h264:basic:3.1"}));
    assert_eq!(from_map, "vc_h264:basic:3.1");
    assert_eq!(from_map, from_string);
}

#[test]
fn test_percent_and_point_offsets_are_equivalent() {
    assert_eq!(compile(json!({"start_offset": "35p"})), "so_35p");
    assert_eq!(compile(json!({"start_offset": "35%"})), "so_35p");
}

#[test]
fn test_numeric_range_matches_string_range() {
    let mut numeric: Vec<String> = compile(json!({"offset": [2.66, 3.21]}))
        .split(',')
        .map(str::to_string)
        .collect();
    let mut string: Vec<String> = compile(json!({"offset": "2.66..3.21"}))
        .split(',')
        .map(str::to_string)
        .collect();
    numeric.sort();
    string.sort();
    assert_eq!(numeric, string);
    assert!(numeric.contains(&"so_2.66".to_string()));
    assert!(numeric.contains(&"eo_3.21".to_string()));
}

#[rstest]
#[case(json!({"offset": "abc"}))]
#[case(json!({"offset": [1]}))]
#[case(json!({"offset": "1..2", "end_offset": 5}))]
#[case(json!({"video_codec": {"profile": "basic"}}))]
#[case(json!({"width": {"nested": true}}))]
#[case(json!({"transformation": [{"width": 1}, "named"]}))]
fn test_invalid_options_are_rejected(#[case] options: Value) {
    let err = generate_transformation_string(from_value(options)).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }), "got {:?}", err);
    assert!(err.is_local());
}

#[rstest]
#[case(json!({"angle": [90, "exif"]}), "a_90.exif")]
#[case(json!({"aspect_ratio": "16:9"}), "ar_16:9")]
#[case(json!({"border": {"width": 4, "color": "#ff0000"}}), "bo_4px_solid_rgb:ff0000")]
#[case(json!({"border": "2px_solid_blue"}), "bo_2px_solid_blue")]
#[case(json!({"color": "#abcdef"}), "co_rgb:abcdef")]
#[case(json!({"color_space": "srgb"}), "cs_srgb")]
#[case(json!({"default_image": "avatar.png"}), "d_avatar.png")]
#[case(json!({"delay": 20}), "dl_20")]
#[case(json!({"density": 150}), "dn_150")]
#[case(json!({"dpr": 2}), "dpr_2.0")]
#[case(json!({"dpr": "auto"}), "dpr_auto")]
#[case(json!({"effect": ["sepia", 50]}), "e_sepia:50")]
#[case(json!({"fetch_format": "auto"}), "f_auto")]
#[case(json!({"flags": ["progressive", "lossy"]}), "fl_progressive.lossy")]
#[case(json!({"fps": [24, 29.97]}), "fps_24-29.97")]
#[case(json!({"keyframe_interval": 10}), "ki_10")]
#[case(json!({"opacity": 50}), "o_50")]
#[case(json!({"page": 2}), "pg_2")]
#[case(json!({"radius": [10, 20]}), "r_10:20")]
#[case(json!({"streaming_profile": "hd"}), "sp_hd")]
#[case(json!({"transformation": "blip"}), "t_blip")]
#[case(json!({"zoom": 1.2}), "z_1.2")]
#[case(json!({"size": "10x20"}), "h_20,w_10")]
fn test_code_table(#[case] options: Value, #[case] expected: &str) {
    assert_eq!(compile(options), expected);
}

#[test]
fn test_nested_chain_preserves_caller_order() {
    let path = compile(json!({
        "transformation": [
            {"overlay": "text:first", "width": 10},
            {"crop": "fill", "width": 100},
            {},
        ],
        "effect": "grayscale",
    }));
    assert_eq!(path, "l_text:first,w_10/c_fill,w_100/e_grayscale");
}

#[test]
fn test_empty_options_compile_to_nothing() {
    let (compiled, leftover) = generate_transformation_string(from_value(json!({}))).unwrap();
    assert!(compiled.is_empty());
    assert!(leftover.is_empty());
}

#[test]
fn test_leftover_keeps_url_options() {
    let (compiled, leftover) = generate_transformation_string(from_value(json!({
        "width": 100,
        "public_id": "sample",
        "version": 3,
        "format": "png",
        "resource_type": "image",
        "type": "upload",
    })))
    .unwrap();
    assert_eq!(compiled.path, "w_100");
    for key in ["public_id", "version", "format", "resource_type", "type"] {
        assert!(leftover.contains_key(key), "missing {}", key);
    }
}

#[test]
fn test_layered_html_size() {
    let (compiled, _) = generate_transformation_string(from_value(json!({
        "width": 100,
        "height": 100,
        "underlay": "text:hello",
    })))
    .unwrap();
    assert_eq!(compiled.path, "h_100,u_text:hello,w_100");
    assert!(compiled.html_size.width.is_none());
    assert!(compiled.html_size.height.is_none());
}

#[test]
fn test_built_segments_match_compiled_options() {
    let mut segment = TransformationSegment::new();
    segment
        .insert(CanonicalParam::new(ParamKey::Width, "100"))
        .unwrap();
    segment
        .insert(CanonicalParam::new(ParamKey::Crop, "fill"))
        .unwrap();
    let chain = TransformationChain::from(segment);
    assert_eq!(
        chain.compile().path,
        compile(json!({"width": 100, "crop": "fill"}))
    );
}
