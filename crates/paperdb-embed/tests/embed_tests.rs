use paperdb_core::traits::Embedder;
use paperdb_embed::{similarity, HashEmbedder};

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = HashEmbedder::new(1024);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let vectors = embedder.encode(&texts, 32).expect("encode");

    assert_eq!(vectors.len(), 2);
    let v1 = &vectors[0];
    let v2 = &vectors[1];
    assert_eq!(v1.len(), 1024, "embedding dim matches configuration");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6, "same input, same vector");
    }
}

#[test]
fn encode_preserves_order_and_length() {
    let embedder = HashEmbedder::new(64);
    let texts: Vec<String> = (0..7).map(|i| format!("text number {i}")).collect();

    let vectors = embedder.encode(&texts, 3).expect("encode");

    assert_eq!(vectors.len(), texts.len());
    // Each input maps to its own vector in order.
    for (i, text) in texts.iter().enumerate() {
        let single = embedder.encode_one(text).expect("encode_one");
        assert_eq!(vectors[i], single);
    }
}

#[test]
fn encode_one_matches_batch_entry() {
    let embedder = HashEmbedder::new(128);
    let v = embedder.encode_one("quarterly revenue grew").expect("encode_one");
    assert_eq!(v.len(), 128);
}

#[test]
fn similar_texts_score_higher_than_unrelated() {
    let embedder = HashEmbedder::new(512);
    let a = embedder.encode_one("the cat sat on the mat").expect("embed");
    let b = embedder.encode_one("the cat sat on the rug").expect("embed");
    let c = embedder.encode_one("zebra xylophone quantum").expect("embed");

    let near = similarity(&a, &b).expect("similarity");
    let far = similarity(&a, &c).expect("similarity");
    assert!(near > far, "shared tokens should raise cosine ({near} vs {far})");
}

#[test]
fn empty_batch_is_fine() {
    let embedder = HashEmbedder::new(32);
    let vectors = embedder.encode(&[], 8).expect("encode");
    assert!(vectors.is_empty());
}
