//! Building an index from PDFs, saving it, and reopening it.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use coach_rag::{
    DEFAULT_COLLECTION, EmbeddingProvider, HashEmbeddingProvider, IndexBuilder, RagConfig,
    RagError, load_documents, open_index,
};
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};

/// Write a PDF with one text line per page.
fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn corpus(dir: &Path) {
    write_pdf(
        &dir.join("periodization.pdf"),
        &[
            "A deload week lowers training volume and intensity so fatigue can dissipate",
            "Progressive overload means adding weight or reps over time",
        ],
    );
    write_pdf(
        &dir.join("recovery.pdf"),
        &["Sleep and protein intake drive recovery between strength sessions"],
    );
    std::fs::write(dir.join("notes.txt"), "not a pdf").unwrap();
}

#[test]
fn loader_reads_one_document_per_page_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    corpus(dir.path());

    let docs = load_documents(dir.path()).unwrap();
    let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["periodization_p1", "periodization_p2", "recovery_p1"]);
    assert!(docs[0].text.contains("deload"));
}

#[test]
fn loader_rejects_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_documents(&dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, RagError::LoaderError { .. }));
}

#[tokio::test]
async fn built_index_reloads_with_identical_retrieval() {
    let docs = tempfile::tempdir().unwrap();
    let index = tempfile::tempdir().unwrap();
    corpus(docs.path());

    let embedder = Arc::new(HashEmbeddingProvider::new(128));
    let config = RagConfig::builder().chunk_size(60).chunk_overlap(10).top_k(2).build().unwrap();
    let summary = IndexBuilder::new(config.clone(), embedder.clone())
        .build(docs.path(), index.path())
        .await
        .unwrap();
    assert_eq!(summary.n_docs, 3);
    assert!(summary.n_chunks >= 3);
    assert_eq!(summary.chunk_size, 60);

    let (first, manifest) = open_index(index.path(), embedder.clone(), config.clone()).await.unwrap();
    assert_eq!(manifest.collection, DEFAULT_COLLECTION);
    assert_eq!(manifest.n_chunks, summary.n_chunks);
    assert_eq!(manifest.embedding_model, "hash-128");

    let (second, _) = open_index(index.path(), embedder, config).await.unwrap();
    let question = "what is a deload week";
    let a = first.query(DEFAULT_COLLECTION, question).await.unwrap();
    let b = second.query(DEFAULT_COLLECTION, question).await.unwrap();

    let texts = |r: &[coach_rag::SearchResult]| r.iter().map(|s| s.chunk.text.clone()).collect::<Vec<_>>();
    assert_eq!(texts(&a), texts(&b));
    assert!(a.len() <= 2);
    assert!(a[0].chunk.text.to_lowercase().contains("deload"));
}

#[tokio::test]
async fn dimension_mismatch_is_rejected_on_load() {
    let docs = tempfile::tempdir().unwrap();
    let index = tempfile::tempdir().unwrap();
    corpus(docs.path());

    IndexBuilder::new(RagConfig::default(), Arc::new(HashEmbeddingProvider::new(64)))
        .build(docs.path(), index.path())
        .await
        .unwrap();

    let err = open_index(index.path(), Arc::new(HashEmbeddingProvider::new(32)), RagConfig::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, RagError::IndexError { .. }), "{err}");
}

/// Returns 64-dimensional vectors while claiming 128.
struct MisreportedDimensions(HashEmbeddingProvider);

#[async_trait]
impl EmbeddingProvider for MisreportedDimensions {
    async fn embed(&self, text: &str) -> coach_rag::Result<Vec<f32>> {
        self.0.embed(text).await
    }

    fn dimensions(&self) -> usize {
        128
    }

    fn model_id(&self) -> &str {
        "misreported"
    }
}

#[tokio::test]
async fn build_refuses_vectors_of_the_wrong_length() {
    let docs = tempfile::tempdir().unwrap();
    let index = tempfile::tempdir().unwrap();
    corpus(docs.path());

    let embedder = Arc::new(MisreportedDimensions(HashEmbeddingProvider::new(64)));
    let err = IndexBuilder::new(RagConfig::default(), embedder)
        .build(docs.path(), index.path())
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::IndexError { .. }), "{err}");
    assert!(!index.path().join("manifest.json").exists());
}

#[tokio::test]
async fn opening_a_missing_index_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result =
        open_index(dir.path(), Arc::new(HashEmbeddingProvider::default()), RagConfig::default()).await;
    assert!(matches!(result, Err(RagError::IndexError { .. })));
}
