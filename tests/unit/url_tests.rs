// Delivery URL tests

use cloudinary::options::from_value;
use cloudinary::signature::url_signature;
use cloudinary::{url, video_thumbnail_url, Config, Error, Options, SignatureAlgorithm};
use rstest::rstest;
use serde_json::{json, Value};

const UPLOAD_PATH: &str = "http://res.cloudinary.com/test123/video/upload";

fn config() -> Config {
    Config::new("test123", "1234", "b")
}

fn video_url(public_id: &str, options: Value) -> (String, cloudinary::Options) {
    let mut options = from_value(options);
    options.insert("resource_type".into(), json!("video"));
    let delivery = url(public_id, options, &config()).unwrap();
    (delivery.url, delivery.leftover)
}

#[test]
fn test_start_offset_auto_end_to_end() {
    // Test: consumed options are gone from what comes back
    let options = from_value(json!({"resource_type": "video", "start_offset": "auto"}));
    let delivery = url("video_id", options, &config()).unwrap();
    assert_eq!(
        delivery.url,
        "http://res.cloudinary.com/test123/video/upload/so_auto/video_id"
    );
    assert!(!delivery.leftover.contains_key("start_offset"));
    assert!(delivery.leftover.is_empty());
}

#[rstest]
#[case(json!({"video_codec": "auto"}), "vc_auto")]
#[case(json!({"video_codec": "h264:basic:3.1"}), "vc_h264:basic:3.1")]
#[case(json!({"video_codec": {"codec": "h264", "profile": "basic", "level": "3.1"}}), "vc_h264:basic:3.1")]
#[case(json!({"audio_codec": "acc"}), "ac_acc")]
#[case(json!({"bit_rate": 2048}), "br_2048")]
#[case(json!({"bit_rate": "44k"}), "br_44k")]
#[case(json!({"bit_rate": "1m"}), "br_1m")]
#[case(json!({"audio_frequency": 44100}), "af_44100")]
#[case(json!({"video_sampling": 20}), "vs_20")]
#[case(json!({"video_sampling": "2.3s"}), "vs_2.3s")]
#[case(json!({"background": "#112233"}), "b_rgb:112233")]
#[case(json!({"overlay": "text:hello"}), "l_text:hello")]
#[case(json!({"underlay": "text:hello"}), "u_text:hello")]
fn test_video_parameters(#[case] options: Value, #[case] transformation: &str) {
    let (url, leftover) = video_url("video_id", options);
    assert_eq!(url, format!("{}/{}/video_id", UPLOAD_PATH, transformation));
    assert!(leftover.is_empty());
}

#[rstest]
#[case("so", "start_offset")]
#[case("eo", "end_offset")]
#[case("du", "duration")]
fn test_offset_family(#[case] code: &str, #[case] key: &str) {
    for (value, expected) in [(json!(2.63), "2.63"), (json!("35p"), "35p"), (json!("35%"), "35p")] {
        let (url, leftover) = video_url("video_id", json!({ key: value }));
        assert_eq!(url, format!("{}/{}_{}/video_id", UPLOAD_PATH, code, expected));
        assert!(leftover.is_empty());
    }
}

#[rstest]
#[case(json!("2.66..3.21"), "so_2.66,eo_3.21")]
#[case(json!([2.66, 3.21]), "so_2.66,eo_3.21")]
#[case(json!(["35%", "70%"]), "so_35p,eo_70p")]
#[case(json!(["35p", "70p"]), "so_35p,eo_70p")]
#[case(json!(["35.5p", "70.5p"]), "so_35.5p,eo_70.5p")]
fn test_offset_ranges(#[case] range: Value, #[case] expected: &str) {
    let (url, leftover) = video_url("video_id", json!({"offset": range}));
    assert!(leftover.is_empty());

    // token order inside the segment is the code order; compare as sets
    let transformation = url
        .trim_end_matches("/video_id")
        .rsplit('/')
        .next()
        .unwrap();
    let mut actual: Vec<&str> = transformation.split(',').collect();
    let mut wanted: Vec<&str> = expected.split(',').collect();
    actual.sort_unstable();
    wanted.sort_unstable();
    assert_eq!(actual, wanted);
}

#[test]
fn test_canonical_order_not_insertion_order() {
    let (url, _) = video_url(
        "test",
        json!({"x": 1, "y": 2, "radius": 3, "gravity": "center", "quality": 0.4, "prefix": "a"}),
    );
    assert_eq!(url, format!("{}/g_center,p_a,q_0.4,r_3,x_1,y_2/test", UPLOAD_PATH));
}

#[rstest]
#[case("overlay", "l")]
#[case("underlay", "u")]
fn test_layers_keep_size_in_token_but_not_in_html(#[case] key: &str, #[case] code: &str) {
    let mut options = from_value(json!({"height": 100, "width": 100}));
    options.insert("resource_type".into(), json!("video"));
    options.insert(key.into(), json!("text:hello"));

    let delivery = url("test", options, &config()).unwrap();
    assert_eq!(
        delivery.url,
        format!("{}/h_100,{}_text:hello,w_100/test", UPLOAD_PATH, code)
    );
    assert_eq!(delivery.html_size.width, None);
    assert_eq!(delivery.html_size.height, None);
    assert!(delivery.leftover.is_empty());
}

#[test]
fn test_html_size_reported_without_layers() {
    let options = from_value(json!({"width": 100, "height": 101, "crop": "crop"}));
    let delivery = url("test", options, &config()).unwrap();
    assert_eq!(
        delivery.url,
        "http://res.cloudinary.com/test123/image/upload/c_crop,h_101,w_100/test"
    );
    assert_eq!(delivery.html_size.width.as_deref(), Some("100"));
    assert_eq!(delivery.html_size.height.as_deref(), Some("101"));
}

#[test]
fn test_video_thumbnail_url() {
    let delivery = video_thumbnail_url("movie_id", from_value(json!({"cloud_name": "test123"})), &Config::default())
        .unwrap();
    assert_eq!(delivery.url, format!("{}/movie_id.jpg", UPLOAD_PATH));
}

#[rstest]
#[case(json!({"secure": true}), "https://res.cloudinary.com/test123/image/upload/test")]
#[case(json!({"secure": true, "private_cdn": true}), "https://test123-res.cloudinary.com/image/upload/test")]
#[case(json!({"private_cdn": true}), "http://test123-res.cloudinary.com/image/upload/test")]
#[case(json!({"secure": true, "secure_distribution": "something.else.com"}), "https://something.else.com/test123/image/upload/test")]
#[case(json!({"cname": "hello.com"}), "http://hello.com/test123/image/upload/test")]
#[case(json!({"cname": "hello.com", "cdn_subdomain": true}), "http://a2.hello.com/test123/image/upload/test")]
#[case(json!({"cname": "hello.com", "cdn_subdomain": true, "secure": true}), "https://res.cloudinary.com/test123/image/upload/test")]
#[case(json!({"cdn_subdomain": true}), "http://res.cloudinary.com/test123/image/upload/test")]
fn test_host_rules(#[case] options: Value, #[case] expected: &str) {
    let delivery = url("test", from_value(options), &config()).unwrap();
    assert_eq!(delivery.url, expected);
}

#[test]
fn test_cloud_name_override() {
    let delivery = url("test", from_value(json!({"cloud_name": "other"})), &config()).unwrap();
    assert_eq!(delivery.url, "http://res.cloudinary.com/other/image/upload/test");
}

#[test]
fn test_missing_cloud_name() {
    let err = url("test", cloudinary::Options::new(), &Config::default()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_format_version_and_type() {
    let options = from_value(json!({"format": "jpg", "version": 1234, "type": "private"}));
    let delivery = url("test", options, &config()).unwrap();
    assert_eq!(
        delivery.url,
        "http://res.cloudinary.com/test123/image/private/v1234/test.jpg"
    );
}

#[test]
fn test_invalid_delivery_type() {
    let err = url("test", from_value(json!({"type": "nope"})), &config()).unwrap_err();
    match err {
        Error::Validation { option, .. } => assert_eq!(option, "type"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_public_id_escaping() {
    let delivery = url("folder/a b?c", cloudinary::Options::new(), &config()).unwrap();
    assert_eq!(
        delivery.url,
        "http://res.cloudinary.com/test123/image/upload/v1/folder/a%20b%3Fc"
    );
}

#[test]
fn test_absolute_upload_url_returned_as_is() {
    let source = "http://example.com/images/logo.png";
    let delivery = url(source, from_value(json!({"width": 100})), &config()).unwrap();
    assert_eq!(delivery.url, source);
}

#[test]
fn test_fetch_url() {
    let source = "http://cloudinary.com/images/logo.png";
    let delivery = url(source, from_value(json!({"type": "fetch"})), &config()).unwrap();
    assert_eq!(
        delivery.url,
        "http://res.cloudinary.com/test123/image/fetch/http://cloudinary.com/images/logo.png"
    );

    let delivery = url(
        source,
        from_value(json!({"type": "fetch", "format": "jpg"})),
        &config(),
    )
    .unwrap();
    assert_eq!(
        delivery.url,
        "http://res.cloudinary.com/test123/image/fetch/f_jpg/http://cloudinary.com/images/logo.png"
    );
}

#[test]
fn test_signed_url() {
    let options = from_value(json!({
        "version": 1234,
        "transformation": {"crop": "crop", "width": 10, "height": 20},
        "sign_url": true,
    }));
    let delivery = url("image.jpg", options, &config()).unwrap();
    let signature =
        url_signature("c_crop,h_20,w_10/image.jpg", Some("b"), SignatureAlgorithm::Sha1).unwrap();
    assert_eq!(
        delivery.url,
        format!(
            "http://res.cloudinary.com/test123/image/upload/{}/c_crop,h_20,w_10/v1234/image.jpg",
            signature
        )
    );
}

#[test]
fn test_signed_url_covers_escaped_public_id() {
    // Test: the signature is over the path as sent, not the raw id
    let options = from_value(json!({"sign_url": true, "width": 10}));
    let delivery = url("my image", options, &config()).unwrap();
    let signature =
        url_signature("w_10/my%20image", Some("b"), SignatureAlgorithm::Sha1).unwrap();
    assert_eq!(
        delivery.url,
        format!(
            "http://res.cloudinary.com/test123/image/upload/{}/w_10/my%20image",
            signature
        )
    );
}

#[test]
fn test_sub_delims_stay_literal_in_public_id() {
    let delivery = url("sample(1)!", Options::new(), &config()).unwrap();
    assert_eq!(
        delivery.url,
        "http://res.cloudinary.com/test123/image/upload/sample(1)!"
    );
}

#[test]
fn test_signed_url_without_secret() {
    let mut config = config();
    config.api_secret = None;
    let err = url("image.jpg", from_value(json!({"sign_url": true})), &config).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_unknown_options_are_returned() {
    let options = from_value(json!({"width": 10, "html_class": "thumb"}));
    let delivery = url("test", options, &config()).unwrap();
    assert_eq!(delivery.leftover.get("html_class"), Some(&json!("thumb")));
}
