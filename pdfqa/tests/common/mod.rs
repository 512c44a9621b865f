//! Shared fixtures: generated PDFs and a deterministic in-process backend.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdfqa::{
    ApiKey, EmbeddingProvider, GenerationRequest, LanguageModel, ModelBackend, QaConfig, QaError,
    QaPipeline,
};

/// Build a PDF with one page per entry; each page shows its text on one line.
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let operations = if text.is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id =
            doc.add_object(Stream::new(dictionary! {}, content.encode().expect("encode content")));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
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
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    bytes
}

/// The three-page invoice document used across scenarios.
pub fn invoice_pdf() -> Vec<u8> {
    build_pdf(&[
        "Welcome to the quarterly report for Acme Corp.",
        "The invoice total is $450.",
        "Thank you for your business.",
    ])
}

const DIMENSIONS: usize = 256;

/// Bag-of-words embedding: each lowercase word adds weight to one hashed bucket.
pub fn keyword_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSIONS];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
                (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
            });
        vector[(hash % DIMENSIONS as u64) as usize] += 1.0;
    }
    vector
}

/// Switches and counters shared between a [`FakeBackend`] and the clients it creates.
#[derive(Default)]
pub struct Probe {
    pub clients_created: AtomicUsize,
    pub embed_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub embed_delay_ms: AtomicU64,
    pub rate_limited: AtomicBool,
    /// Embedding calls currently running, and the most ever seen at once.
    pub embeds_in_flight: AtomicUsize,
    pub max_embeds_in_flight: AtomicUsize,
}

pub struct KeywordEmbedder {
    probe: Arc<Probe>,
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> pdfqa::Result<Vec<f32>> {
        self.probe.embed_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.probe.embeds_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_embeds_in_flight.fetch_max(running, Ordering::SeqCst);
        let delay = self.probe.embed_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.probe.embeds_in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.probe.rate_limited.load(Ordering::SeqCst) {
            return Err(QaError::RateLimit {
                provider: "fake".into(),
                message: "slow down".into(),
                retry_after: None,
            });
        }
        Ok(keyword_embedding(text))
    }
}

/// Answers with the context it was given, so tests can see what was retrieved.
pub struct EchoModel {
    probe: Arc<Probe>,
}

#[async_trait]
impl LanguageModel for EchoModel {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: &GenerationRequest) -> pdfqa::Result<String> {
        self.probe.generate_calls.fetch_add(1, Ordering::SeqCst);
        let before_question = request.prompt.split("\n\nQuestion:").next().unwrap_or_default();
        let context = before_question.split_once("\n\n").map(|(_, c)| c).unwrap_or_default();
        Ok(format!("According to the document: {context}"))
    }
}

#[derive(Default)]
pub struct FakeBackend {
    pub probe: Arc<Probe>,
}

impl ModelBackend for FakeBackend {
    fn embedding_provider(&self, api_key: &ApiKey) -> pdfqa::Result<Arc<dyn EmbeddingProvider>> {
        api_key.require("fake")?;
        self.probe.clients_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(KeywordEmbedder { probe: self.probe.clone() }))
    }

    fn language_model(&self, api_key: &ApiKey) -> pdfqa::Result<Arc<dyn LanguageModel>> {
        api_key.require("fake")?;
        self.probe.clients_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(EchoModel { probe: self.probe.clone() }))
    }
}

/// A pipeline wired to a [`FakeBackend`], plus the backend's probe.
pub fn fake_pipeline(config: QaConfig) -> (QaPipeline, Arc<Probe>) {
    let backend = FakeBackend::default();
    let probe = backend.probe.clone();
    let pipeline = QaPipeline::builder()
        .config(config)
        .backend(Arc::new(backend))
        .build()
        .expect("pipeline builds");
    (pipeline, probe)
}

pub fn key() -> ApiKey {
    ApiKey::new("sk-test")
}
