// Operation descriptor codec tests

use edge_image_optimizer::descriptor::*;

#[test]
fn test_decode_reads_recognized_keys() {
    let descriptor = Descriptor::decode("format=webp,quality=80,width=400");
    assert_eq!(descriptor.get(FORMAT), Some("webp"));
    assert_eq!(descriptor.get(QUALITY), Some("80"));
    assert_eq!(descriptor.get(WIDTH), Some("400"));
    assert_eq!(descriptor.get(HEIGHT), None);
}

#[test]
fn test_encode_is_order_independent() {
    let a = Descriptor::decode("width=400,format=webp,quality=80");
    let b = Descriptor::decode("quality=80,width=400,format=webp");
    assert_eq!(a.encode(), b.encode());
    assert_eq!(a.encode(), "format=webp,quality=80,width=400");
}

#[test]
fn test_original_marker_decodes_to_empty() {
    assert!(Descriptor::decode(ORIGINAL_MARKER).is_empty());
}

#[test]
fn test_original_marker_with_routing() {
    let descriptor = Descriptor::decode("original,fromBucket=src,toBucket=dst");
    assert_eq!(descriptor.get(FROM_BUCKET), Some("src"));
    assert_eq!(descriptor.get(TO_BUCKET), Some("dst"));
    assert!(descriptor.without_routing().is_empty());
}

#[test]
fn test_unknown_keys_are_not_encoded() {
    let descriptor = Descriptor::decode("width=10,blur=5");
    assert_eq!(descriptor.get("blur"), Some("5"));
    assert_eq!(descriptor.encode(), "width=10");
}

#[test]
fn test_without_routing_keeps_transform_keys() {
    let descriptor =
        Descriptor::decode("fromBucket=a,toBucket=b,toBucketRegion=us-west-2,height=50,ratio=16:9");
    assert_eq!(descriptor.without_routing().encode(), "ratio=16:9,height=50");
}
