// Edge request normalizer tests

use edge_image_optimizer::descriptor::Descriptor;
use edge_image_optimizer::edge::{normalize, resolve_auto_format, EdgeRequest};
use rstest::rstest;

fn rewrite(uri: &str, query: &str, accept: Option<&str>) -> String {
    normalize(&EdgeRequest::from_raw_query(uri, Some(query), accept)).uri
}

#[rstest]
#[case("width=100&format=webp&quality=80", "format=webp&quality=80&width=100")]
#[case("height=5&ratio=4:3", "ratio=4:3&height=5")]
#[case("to_bucket=b&width=1&from_bucket=a", "from_bucket=a&width=1&to_bucket=b")]
fn test_rewrite_is_independent_of_parameter_order(#[case] a: &str, #[case] b: &str) {
    assert_eq!(
        rewrite("/images/a.jpg", a, None),
        rewrite("/images/a.jpg", b, None)
    );
}

#[test]
fn test_rewritten_descriptor_round_trips_through_codec() {
    let uri = rewrite(
        "/images/a.jpg",
        "width=100&format=webp&quality=150",
        None,
    );
    let (_, descriptor) = uri.rsplit_once('/').unwrap();
    assert_eq!(Descriptor::decode(descriptor).encode(), descriptor);
    assert_eq!(descriptor, "format=webp,quality=100,width=100");
}

#[test]
fn test_empty_query_rewrites_to_original() {
    let out = normalize(&EdgeRequest::from_raw_query("/images/a.jpg", None, None));
    assert_eq!(out.uri, "/images/a.jpg/original");
    assert_eq!(out.querystring, "");
}

#[test]
fn test_invalid_values_never_fail() {
    let uri = rewrite(
        "/a.jpg",
        "width=abc&height=-1&quality=0&format=bmp",
        Some("image/webp"),
    );
    assert_eq!(uri, "/a.jpg/original");
}

#[rstest]
#[case("/a.jpg", Some("image/webp,*/*"), "webp")]
#[case("/a.jpg", Some("image/avif"), "avif")]
#[case("/a.png", None, "png")]
#[case("/a.PNG", Some("text/html"), "png")]
#[case("/a.jpg", None, "jpeg")]
#[case("/a", None, "jpeg")]
fn test_auto_format_resolution(
    #[case] path: &str,
    #[case] accept: Option<&str>,
    #[case] expected: &str,
) {
    assert_eq!(resolve_auto_format(path, accept), expected);
}
