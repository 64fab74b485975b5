use assert_matches::assert_matches;
use goods_receipts::{
    http_client::ApiClient,
    models::{DocumentUpload, EntityId, GoodsReceiptStatus, ReceiptPayload},
    repositories::{
        goods_receipts::{CHANGE_STATUS_PATH, CREATE_PATH, DETAIL_PATH, LIST_PATH, SEARCH_PATH, UPDATE_PATH},
        purchase_orders::{PRODUCTS_PATH, PURCHASE_ORDER_DETAIL_PATH, UPLOAD_DOCUMENT_PATH},
        GoodsReceiptRepository, HttpGoodsReceiptRepository, HttpPurchaseOrderGateway,
        PurchaseOrderGateway,
    },
    ClientConfig, ServiceError,
};
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, header_regex, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn client_for(server: &MockServer) -> ApiClient {
    let mut config = ClientConfig::new(server.uri());
    config.auth_token = Some("secret-token".into());
    ApiClient::new(&config).unwrap()
}

fn repository(server: &MockServer) -> HttpGoodsReceiptRepository {
    HttpGoodsReceiptRepository::new(client_for(server), 100)
}

fn row(id: u32, code: &str) -> serde_json::Value {
    json!({"id": id, "code": code, "status": "DRAFT", "receiptDate": "2024-05-01", "subTotal": 10.5})
}

fn payload(id: Option<&str>) -> ReceiptPayload {
    serde_json::from_value(json!({
        "id": id,
        "purchaseOrderId": "PO-001",
        "warehouseId": "WH-1",
        "supplierId": "SUP-1",
        "documents": ["doc-1"],
        "products": [{
            "productId": "A",
            "quantity": 5,
            "unitPrice": 100,
            "totalPrice": 500,
            "location": "A-01",
            "stack": 1,
            "fee": 0
        }],
        "status": "DRAFT",
        "receiptDate": "2024-05-01T08:00:00Z",
        "subTotal": 500
    }))
    .unwrap()
}

#[tokio::test]
async fn list_requests_first_page_sorted_by_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("page", "0"))
        .and(query_param("size", "100"))
        .and(query_param("sort", "receiptDate,desc"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"content": [row(1, "PN-2024-001"), row(2, "PN-2024-002")], "totalElements": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipts = repository(&server).list().await.unwrap();
    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts[0].id, EntityId::from("1"));
    assert_eq!(receipts[0].display_code(), "PN-2024-001");
    assert_eq!(receipts[0].sub_total, dec!(10.5));
}

#[tokio::test]
async fn search_accepts_flat_and_bare_envelopes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("keyword", "PN-2024"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [row(1, "PN-2024-001")]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("keyword", "GR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(4, "GR-0004")])))
        .mount(&server)
        .await;

    let repo = repository(&server);
    assert_eq!(repo.search("PN-2024").await.unwrap().len(), 1);
    let bare = repo.search("  GR ").await.unwrap();
    assert_eq!(bare[0].display_code(), "GR-0004");
}

#[tokio::test]
async fn unknown_envelope_degrades_to_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [row(1, "x")]})))
        .mount(&server)
        .await;

    assert!(repository(&server).list().await.unwrap().is_empty());
}

#[tokio::test]
async fn transport_failure_is_rethrown_with_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "Maintenance window"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let repo = repository(&server);
    assert_matches!(
        repo.list().await,
        Err(ServiceError::ExternalApiError(msg)) if msg == "Maintenance window"
    );
    assert_matches!(
        repo.search("PN").await,
        Err(ServiceError::ExternalApiError(msg)) if msg == "Search goods receipts failed with status 500"
    );
}

#[tokio::test]
async fn detail_unwraps_data_and_maps_absence_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": 1,
                "code": "PN-2024-001",
                "status": "PARTIAL",
                "products": [{"productId": "A", "quantity": 4, "unitPrice": 2.5, "stack": 1}]
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("id", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("id", "3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let repo = repository(&server);
    let receipt = repo.get_by_id(&"1".into()).await.unwrap().unwrap();
    assert_eq!(receipt.status, GoodsReceiptStatus::Partial);
    assert_eq!(receipt.products[0].total_price, dec!(10));
    assert_eq!(repo.get_by_id(&"2".into()).await.unwrap(), None);
    assert_eq!(repo.get_by_id(&"3".into()).await.unwrap(), None);
}

#[tokio::test]
async fn create_and_update_post_the_full_payload() {
    let server = MockServer::start().await;
    let create_body = serde_json::to_value(payload(None)).unwrap();
    assert!(create_body.get("id").is_none());

    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .and(body_json(&create_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"id": 31}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPDATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "Receipt is locked"})))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repository(&server);
    let created = repo.create(&payload(None)).await.unwrap();
    assert_eq!(created.entity_id(), Some(EntityId::from("31")));

    assert_matches!(
        repo.update(&payload(Some("31"))).await,
        Err(ServiceError::ExternalApiError(msg)) if msg == "Receipt is locked"
    );
    assert_matches!(
        repo.update(&payload(None)).await,
        Err(ServiceError::InvalidOperation(_))
    );
}

#[tokio::test]
async fn write_rejected_with_404_keeps_backend_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Purchase order PO-001 was deleted"})),
        )
        .mount(&server)
        .await;

    let err = repository(&server).create(&payload(None)).await.unwrap_err();
    assert_matches!(&err, ServiceError::ExternalApiError(_));
    assert_eq!(err.user_message(), "Purchase order PO-001 was deleted");
}

#[tokio::test]
async fn change_status_rejection_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHANGE_STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "Receipt already approved"})),
        )
        .mount(&server)
        .await;

    assert_matches!(
        repository(&server).change_status(&"1".into()).await,
        Err(ServiceError::ExternalApiError(msg)) if msg == "Receipt already approved"
    );
}

#[tokio::test]
async fn change_status_posts_only_the_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHANGE_STATUS_PATH))
        .and(body_json(json!({"id": "1"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let result = repository(&server).change_status(&"1".into()).await.unwrap();
    assert_eq!(result.success, None);
}

#[tokio::test]
async fn gateway_reads_reference_data_and_uploads_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "A", "name": "Widget", "sku": "W-1", "costPrice": 90}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PURCHASE_ORDER_DETAIL_PATH))
        .and(query_param("id", "PO-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": "PO-001",
                "supplier": {"id": "SUP-1", "name": "Acme"},
                "warehouseId": "WH-1",
                "products": [{"productId": "A", "quantity": 5, "unitPrice": 100}]
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_DOCUMENT_PATH))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "doc-7"}})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpPurchaseOrderGateway::new(client_for(&server));

    let products = gateway.list_products().await.unwrap();
    assert_eq!(products[0].cost, Some(dec!(90)));
    assert_eq!(products[0].code.as_deref(), Some("W-1"));

    let order = gateway.get_order_by_id(&"PO-001".into()).await.unwrap().unwrap();
    assert_eq!(order.supplier_ref(), Some(&EntityId::from("SUP-1")));
    assert_eq!(order.products[0].unit_price, dec!(100));

    let document = gateway
        .upload_document(DocumentUpload {
            file_name: "delivery-note.pdf".into(),
            content_type: Some("application/pdf".into()),
            bytes: b"%PDF-1.4".to_vec(),
        })
        .await
        .unwrap();
    assert_eq!(document.id, EntityId::from("doc-7"));
    assert_eq!(document.name, "delivery-note.pdf");
}

#[tokio::test]
async fn unreachable_backend_reports_generic_failure() {
    let config = ClientConfig::new("http://127.0.0.1:1");
    let repo = HttpGoodsReceiptRepository::from_config(&config).unwrap();

    let err = repo.list().await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Load goods receipts failed: the server could not be reached"
    );
}
