//! End-to-end pipeline scenarios against scripted collaborators

mod helpers;

use erp_assistant::action::{DisplayHint, ScalarValue};
use erp_assistant::agentic::ConversationTurn;
use erp_assistant::error::BackendError;
use erp_assistant::executor::MAX_FALLBACK_LIMIT;
use erp_assistant::pipeline::AnswerData;
use erp_assistant::predicate::NativePredicate;
use erp_assistant::schema::{RoleContext, NO_ACCESSIBLE_ENTITIES};
use helpers::{partner, pipeline, role, LlmReply, ScriptedLlm, ScriptedStore, StoreCall};

#[tokio::test]
async fn count_answer_contains_store_integer() {
    let llm = ScriptedLlm::replying(&[r#"{"type":"count","table":"res.partner"}"#]);
    let store = ScriptedStore::new().with_count(42);

    let answer = pipeline(llm.clone(), store.clone())
        .answer("Kaç müşteri var?", &[], &role("Admin"))
        .await;

    assert!(answer.content.contains("42"));
    assert_eq!(
        answer.data,
        Some(AnswerData::Count {
            entity: "res.partner".to_string(),
            count: 42
        })
    );
    assert_eq!(answer.display_hint, Some(DisplayHint::Stat));
    assert_eq!(
        store.calls(),
        vec![StoreCall::Count {
            entity: "res.partner".to_string(),
            predicates: vec![]
        }]
    );
    // Translation only: count results are never summarized
    assert_eq!(llm.calls().len(), 1);
}

#[tokio::test]
async fn empty_filtered_search_falls_back_unfiltered() {
    let llm = ScriptedLlm::replying(&[
        r#"{"type":"query","table":"res.partner","filters":[{"column":"name","operator":"ilike","value":"Ahmet"}],"fields":["name","email"],"limit":20}"#,
        "Ahmet adında bir müşteri bulunamadı; son kayıtlar gösteriliyor.",
    ]);
    let store = ScriptedStore::new()
        .with_rows(vec![])
        .with_rows(vec![partner(1, "Ayşe"), partner(2, "Mehmet")]);

    let answer = pipeline(llm.clone(), store.clone())
        .answer("Ahmet isimli müşteriyi bul", &[], &role("Admin"))
        .await;

    let searches = store.searches();
    assert_eq!(searches.len(), 2);
    assert_eq!(searches[0].predicates.len(), 1);
    assert_eq!(searches[0].predicates[0].op, "ilike");
    assert!(searches[1].predicates.is_empty());
    assert!(searches[1].limit <= MAX_FALLBACK_LIMIT);
    assert_eq!(searches[1].fields, searches[0].fields);

    match &answer.data {
        Some(AnswerData::Rows {
            rows, is_fallback, ..
        }) => {
            assert!(*is_fallback);
            assert_eq!(rows.len(), 2);
        }
        other => panic!("expected rows, got {:?}", other),
    }

    let calls = llm.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].system_prompt.contains("nothing matched"));
    assert!(calls[1].message.contains("Total row count: 2"));
    assert!(calls[1].message.contains("Ahmet isimli müşteriyi bul"));
}

#[tokio::test]
async fn plain_reply_is_returned_verbatim() {
    let greeting = "Merhaba, size nasıl yardımcı olabilirim?";
    let llm = ScriptedLlm::replying(&[greeting]);
    let store = ScriptedStore::new();

    let answer = pipeline(llm, store.clone())
        .answer("Merhaba", &[], &role("Personel"))
        .await;

    assert_eq!(answer.content, greeting);
    assert_eq!(answer.data, None);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn forbidden_entity_never_reaches_store() {
    let llm = ScriptedLlm::replying(&[r#"{"type":"query","table":"res.partner"}"#]);
    let store = ScriptedStore::new();

    let answer = pipeline(llm.clone(), store.clone())
        .answer("Müşterileri listele", &[], &role("Personel"))
        .await;

    assert!(store.calls().is_empty());
    assert!(answer.content.contains("res.partner"));
    assert_eq!(answer.data, None);
    assert_eq!(llm.calls().len(), 1);
}

#[tokio::test]
async fn unknown_field_never_reaches_store() {
    let llm = ScriptedLlm::replying(&[
        r#"{"type":"count","table":"sale.order","filters":[{"column":"margin","operator":"gt","value":0}]}"#,
    ]);
    let store = ScriptedStore::new();

    pipeline(llm, store.clone())
        .answer("Kârlı siparişler kaç tane?", &[], &role("Yönetici"))
        .await;

    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn role_without_access_sees_marker() {
    let llm = ScriptedLlm::replying(&["Bu rolün veri erişimi yok."]);
    let store = ScriptedStore::new();

    let answer = pipeline(llm.clone(), store)
        .answer("Kaç ürün var?", &[], &role("Stajyer"))
        .await;

    assert_eq!(answer.content, "Bu rolün veri erişimi yok.");
    assert!(llm.calls()[0].system_prompt.contains(NO_ACCESSIBLE_ENTITIES));
}

#[tokio::test]
async fn prompt_is_scoped_to_role() {
    let llm = ScriptedLlm::replying(&["Tamam."]);
    let explicit = RoleContext::new("Depo", ["product.product"]);

    pipeline(llm.clone(), ScriptedStore::new())
        .answer("Ürünler", &[], &explicit)
        .await;

    let prompt = &llm.calls()[0].system_prompt;
    assert!(prompt.contains("TABLE: product.product"));
    assert!(!prompt.contains("TABLE: res.partner"));
    assert!(!prompt.contains("TABLE: sale.order"));
}

#[tokio::test]
async fn history_is_forwarded_to_translation() {
    let llm = ScriptedLlm::replying(&["Tamam."]);
    let history = vec![
        ConversationTurn::user("Siparişleri göster"),
        ConversationTurn::assistant("İşte siparişler."),
    ];

    pipeline(llm.clone(), ScriptedStore::new())
        .answer("Sadece onaylananlar", &history, &role("Admin"))
        .await;

    let calls = llm.calls();
    assert_eq!(calls[0].history_len, 2);
    assert_eq!(calls[0].message, "Sadece onaylananlar");
}

#[tokio::test]
async fn translation_outage_yields_apology() {
    let llm = ScriptedLlm::new(vec![LlmReply::Unavailable]);
    let store = ScriptedStore::new();

    let answer = pipeline(llm, store.clone())
        .answer("Kaç müşteri var?", &[], &role("Admin"))
        .await;

    assert!(answer.content.contains("Üzgünüm"));
    assert_eq!(answer.data, None);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn summary_outage_keeps_data() {
    let llm = ScriptedLlm::new(vec![
        LlmReply::Text(r#"{"type":"query","table":"product.product","display":"chart"}"#.into()),
        LlmReply::Unavailable,
    ]);
    let store = ScriptedStore::new().with_rows(vec![partner(1, "Masa"), partner(2, "Sandalye")]);

    let answer = pipeline(llm, store)
        .answer("Ürünleri grafikte göster", &[], &role("Personel"))
        .await;

    assert!(answer.content.contains("Veriler getirildi"));
    assert_eq!(answer.display_hint, Some(DisplayHint::Chart));
    match answer.data {
        Some(AnswerData::Rows {
            rows, is_fallback, ..
        }) => {
            assert_eq!(rows.len(), 2);
            assert!(!is_fallback);
        }
        other => panic!("expected rows, got {:?}", other),
    }
}

#[tokio::test]
async fn backend_error_is_explained_without_details() {
    let llm = ScriptedLlm::replying(&[r#"{"type":"query","table":"res.partner"}"#]);
    let store = ScriptedStore::new().with_search_error(BackendError::Fault {
        code: 1,
        message: "Access Denied for odoo_admin".to_string(),
    });

    let answer = pipeline(llm.clone(), store)
        .answer("Müşterileri listele", &[], &role("Admin"))
        .await;

    assert!(answer.content.contains("ERP sistemi"));
    assert!(!answer.content.contains("Access Denied"));
    assert!(!answer.content.contains("odoo_admin"));
    assert_eq!(answer.data, None);
    assert_eq!(llm.calls().len(), 1);
}

#[tokio::test]
async fn count_login_failure_hides_credentials() {
    let llm = ScriptedLlm::replying(&[r#"{"type":"count","table":"res.partner"}"#]);
    let store = ScriptedStore::new().with_count_error(BackendError::Authentication {
        username: "odoo_admin".to_string(),
        database: "erp_prod".to_string(),
    });

    let answer = pipeline(llm, store)
        .answer("Kaç müşteri var?", &[], &role("Admin"))
        .await;

    assert!(answer.content.contains("giriş yapılamadı"));
    assert!(!answer.content.contains("odoo_admin"));
    assert!(!answer.content.contains("erp_prod"));
    assert_eq!(answer.data, None);
}

#[tokio::test]
async fn filtered_count_passes_translated_predicates() {
    let llm = ScriptedLlm::replying(&[
        r#"{"type":"count","table":"sale.order","filters":[{"column":"state","operator":"eq","value":"sale"},{"column":"amount_total","operator":"gte","value":1000}]}"#,
    ]);
    let store = ScriptedStore::new().with_count(7);

    let answer = pipeline(llm, store.clone())
        .answer("Kaç onaylı sipariş var?", &[], &role("Yönetici"))
        .await;

    assert_eq!(
        store.calls(),
        vec![StoreCall::Count {
            entity: "sale.order".to_string(),
            predicates: vec![
                NativePredicate {
                    column: "state".to_string(),
                    op: "=",
                    value: ScalarValue::Text("sale".to_string()),
                },
                NativePredicate {
                    column: "amount_total".to_string(),
                    op: ">=",
                    value: ScalarValue::Integer(1000),
                },
            ],
        }]
    );
    assert!(answer.content.contains("**7**"));
}

#[tokio::test]
async fn no_rows_anywhere_reports_no_data() {
    let llm = ScriptedLlm::replying(&[
        r#"{"type":"query","table":"sale.order","filters":[{"column":"state","operator":"eq","value":"cancel"}]}"#,
    ]);
    let store = ScriptedStore::new().with_rows(vec![]).with_rows(vec![]);

    let answer = pipeline(llm.clone(), store.clone())
        .answer("İptal edilen siparişler", &[], &role("Admin"))
        .await;

    assert_eq!(store.searches().len(), 2);
    assert!(answer.content.contains("bulunamadı"));
    assert_eq!(answer.data, None);
    assert_eq!(llm.calls().len(), 1);
}

#[tokio::test]
async fn query_limit_is_clamped() {
    let llm = ScriptedLlm::replying(&[
        r#"{"type":"query","table":"product.product","limit":5000}"#,
        "Ürünler listelendi.",
    ]);
    let store = ScriptedStore::new().with_rows(vec![partner(1, "Masa")]);

    pipeline(llm, store.clone())
        .answer("Bütün ürünler", &[], &role("Admin"))
        .await;

    assert_eq!(store.searches()[0].limit, 100);
}
