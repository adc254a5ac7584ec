//! Build and query behavior of the dual-store index

mod common;

use std::collections::HashSet;
use std::time::Duration;

use report_rag::config::{RetrievalConfig, StoreConfig};
use report_rag::providers::HashEmbedder;
use report_rag::{Element, ElementKind, Error, IndexInput, RetrieverBinding, SummarizedTable};

use common::*;

fn binding() -> RetrieverBinding {
    let retrieval = RetrievalConfig {
        top_k: 10,
        min_similarity: None,
    };
    RetrieverBinding::in_memory("qatar_report", &retrieval)
}

fn pair(position: usize, table: &str, summary: &str) -> SummarizedTable {
    SummarizedTable {
        table: Element::table(position, table, None),
        summary: summary.to_string(),
    }
}

fn sample_input() -> IndexInput {
    IndexInput::new(
        "report.pdf",
        vec![
            Element::text(0, GDP_TEXT),
            Element::text(2, "Inflation eased to 2.5 percent."),
            Element::text(4, "The fiscal surplus widened."),
        ],
        vec![pair(1, GDP_TABLE, GDP_SUMMARY), pair(3, DEBT_TABLE, DEBT_SUMMARY)],
    )
}

#[tokio::test]
async fn every_element_yields_one_record() {
    let binding = binding();
    let snapshot = binding.build(sample_input(), &embedder()).await.unwrap();

    assert_eq!(snapshot.search_store().len(), 5);
    assert_eq!(snapshot.payload_store().len(), 5);
    assert_eq!(snapshot.meta.text_records, 3);
    assert_eq!(snapshot.meta.table_records, 2);

    let ids: HashSet<_> = snapshot.search_store().records().iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 5);

    let stats = binding.stats();
    assert!(stats.ready);
    assert_eq!(stats.search_records, 5);
    assert_eq!(stats.payload_records, 5);
}

#[tokio::test]
async fn tables_are_searched_by_summary_and_returned_raw() {
    let snapshot = binding().build(sample_input(), &embedder()).await.unwrap();

    let mut tables = 0;
    for record in snapshot.search_store().records() {
        let stored = snapshot.payload_store().get(&record.id).unwrap();
        if stored.kind != ElementKind::Table {
            continue;
        }
        tables += 1;
        assert_ne!(record.surrogate, stored.element.content);
        match stored.element.content.as_str() {
            GDP_TABLE => assert_eq!(record.surrogate, GDP_SUMMARY),
            DEBT_TABLE => assert_eq!(record.surrogate, DEBT_SUMMARY),
            other => panic!("unexpected table payload {}", other),
        }
    }
    assert_eq!(tables, 2);
}

#[tokio::test]
async fn text_is_its_own_surrogate() {
    let snapshot = binding().build(sample_input(), &embedder()).await.unwrap();

    for record in snapshot.search_store().records() {
        let stored = snapshot.payload_store().get(&record.id).unwrap();
        if stored.kind == ElementKind::Text {
            assert_eq!(record.surrogate, stored.element.content);
        }
    }
}

#[tokio::test]
async fn identifiers_resolve_to_the_exact_input_element() {
    let input = sample_input();
    let mut expected: Vec<Element> = input.texts.clone();
    expected.extend(input.tables.iter().map(|p| p.table.clone()));

    let snapshot = binding().build(input, &embedder()).await.unwrap();

    let resolved: Vec<Element> = snapshot
        .search_store()
        .records()
        .iter()
        .map(|r| snapshot.payload_store().get(&r.id).unwrap().element.clone())
        .collect();
    assert_eq!(resolved, expected);
}

#[tokio::test]
async fn empty_build_is_queryable() {
    let binding = binding();
    binding
        .build(IndexInput::new("empty.pdf", Vec::new(), Vec::new()), &embedder())
        .await
        .unwrap();

    assert!(binding.is_ready());
    let results = binding.retrieve("What was GDP growth?", &embedder()).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn query_before_build_is_not_ready() {
    let err = binding()
        .retrieve("What was GDP growth?", &embedder())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotReady));
    assert_eq!(err.to_string(), "Please process the document first!");
}

#[tokio::test]
async fn summary_match_returns_original_table() {
    let binding = binding();
    binding
        .build(
            IndexInput::new(
                "report.pdf",
                vec![Element::text(0, GDP_TEXT)],
                vec![pair(1, GDP_TABLE, GDP_SUMMARY)],
            ),
            &embedder(),
        )
        .await
        .unwrap();

    let results = binding.retrieve("What was GDP growth?", &embedder()).await.unwrap();
    assert_eq!(results.len(), 2);

    let top = &results[0];
    assert_eq!(top.element.kind, ElementKind::Table);
    assert_eq!(top.element.content, GDP_TABLE);
    assert!(top.similarity > results[1].similarity);
    assert!(results.iter().all(|r| r.element.content != GDP_SUMMARY));
}

#[tokio::test]
async fn misaligned_summaries_fail_fast() {
    let binding = binding();
    let err = binding
        .build_aligned(
            "report.pdf",
            vec![Element::text(0, GDP_TEXT)],
            vec![Element::table(1, GDP_TABLE, None)],
            Vec::new(),
            &embedder(),
        )
        .await
        .unwrap_err();

    match err {
        Error::Validation(message) => assert!(message.contains("0 summaries for 1 tables")),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(!binding.is_ready());
}

#[tokio::test]
async fn failed_rebuild_keeps_previous_index() {
    let binding = binding();
    let first = binding.build(sample_input(), &embedder()).await.unwrap();

    let err = binding
        .build_aligned(
            "report.pdf",
            Vec::new(),
            vec![Element::table(0, DEBT_TABLE, None)],
            vec!["one".to_string(), "two".to_string()],
            &embedder(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let current = binding.snapshot().unwrap();
    assert_eq!(current.search_store().records(), first.search_store().records());
}

#[tokio::test]
async fn rebuild_replaces_previous_index() {
    let binding = binding();
    let first = binding.build(sample_input(), &embedder()).await.unwrap();
    let first_ids: HashSet<_> = first.search_store().records().iter().map(|r| r.id).collect();

    let second = binding
        .build(
            IndexInput::new(
                "revised.pdf",
                vec![Element::text(0, "Hydrocarbon output was flat.")],
                vec![pair(1, DEBT_TABLE, DEBT_SUMMARY)],
            ),
            &embedder(),
        )
        .await
        .unwrap();

    assert_eq!(second.len(), 2);
    assert!(second
        .search_store()
        .records()
        .iter()
        .all(|r| !first_ids.contains(&r.id)));

    let results = binding.retrieve("What was GDP growth?", &embedder()).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.element.content != GDP_TEXT && r.element.content != GDP_TABLE));
    assert_eq!(binding.stats().document.as_deref(), Some("revised.pdf"));
}

#[tokio::test]
async fn concurrent_build_is_rejected() {
    let binding = binding();
    let slow = SlowEmbedder::new(Duration::from_millis(100));

    let (first, second) = tokio::join!(
        binding.build(sample_input(), &slow),
        binding.build(sample_input(), &slow),
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(Error::BuildInProgress)));
    assert_eq!(binding.stats().search_records, 5);
}

#[tokio::test]
async fn queries_during_a_build_see_the_previous_index() {
    let binding = binding();
    binding
        .build(
            IndexInput::new("report.pdf", vec![Element::text(0, GDP_TEXT)], Vec::new()),
            &embedder(),
        )
        .await
        .unwrap();

    let slow = SlowEmbedder::new(Duration::from_millis(100));
    let fast = embedder();
    let (rebuilt, during) = tokio::join!(
        binding.build(sample_input(), &slow),
        binding.retrieve("What was GDP growth?", &fast),
    );

    rebuilt.unwrap();
    let during = during.unwrap();
    assert_eq!(during.len(), 1);
    assert_eq!(during[0].element.content, GDP_TEXT);
    assert_eq!(binding.stats().search_records, 5);
}

#[tokio::test]
async fn top_k_limits_results() {
    let binding = RetrieverBinding::in_memory(
        "qatar_report",
        &RetrievalConfig {
            top_k: 2,
            min_similarity: None,
        },
    );
    binding.build(sample_input(), &embedder()).await.unwrap();

    let results = binding.retrieve("GDP debt inflation", &embedder()).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].similarity >= results[1].similarity);
}

#[tokio::test]
async fn persisted_index_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreConfig {
        persist: true,
        persist_dir: dir.path().to_path_buf(),
        collection: "qatar_report".to_string(),
    };
    let retrieval = RetrievalConfig::default();

    let built = {
        let binding = RetrieverBinding::open(&store, &retrieval, &embedder());
        assert!(!binding.is_ready());
        binding.build(sample_input(), &embedder()).await.unwrap()
    };
    assert!(dir.path().join("qatar_report.json").exists());

    let reopened = RetrieverBinding::open(&store, &retrieval, &embedder());
    let snapshot = reopened.snapshot().unwrap();
    assert_eq!(snapshot.search_store().records(), built.search_store().records());
    for record in snapshot.search_store().records() {
        assert_eq!(
            snapshot.payload_store().get(&record.id),
            built.payload_store().get(&record.id)
        );
    }

    let results = reopened.retrieve("What was GDP growth?", &embedder()).await.unwrap();
    assert_eq!(results[0].element.content, GDP_TABLE);

    // Vectors from a different embedder are not comparable
    let other = RetrieverBinding::open(&store, &retrieval, &HashEmbedder::new(64));
    assert!(!other.is_ready());
}

#[tokio::test]
async fn rebuild_overwrites_persisted_index() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreConfig {
        persist: true,
        persist_dir: dir.path().to_path_buf(),
        collection: "qatar_report".to_string(),
    };
    let retrieval = RetrievalConfig::default();

    let binding = RetrieverBinding::open(&store, &retrieval, &embedder());
    binding.build(sample_input(), &embedder()).await.unwrap();
    binding
        .build(
            IndexInput::new("report.pdf", vec![Element::text(0, GDP_TEXT)], Vec::new()),
            &embedder(),
        )
        .await
        .unwrap();

    let reopened = RetrieverBinding::open(&store, &retrieval, &embedder());
    assert_eq!(reopened.stats().search_records, 1);
    assert_eq!(reopened.stats().payload_records, 1);
}

#[tokio::test]
async fn unreadable_persisted_index_is_replaced_by_next_build() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("qatar_report.json"), "{\"meta\": trunc").unwrap();
    let store = StoreConfig {
        persist: true,
        persist_dir: dir.path().to_path_buf(),
        collection: "qatar_report".to_string(),
    };
    let retrieval = RetrievalConfig::default();

    let binding = RetrieverBinding::open(&store, &retrieval, &embedder());
    assert!(!binding.is_ready());
    binding.build(sample_input(), &embedder()).await.unwrap();

    let reopened = RetrieverBinding::open(&store, &retrieval, &embedder());
    assert!(reopened.is_ready());
    assert_eq!(reopened.stats().search_records, 5);
}
