//! End-to-end request handling through `RequestHandler::handle`.

mod common;

use common::http_util::{body_json, content_type, json_request, request, with_header};
use common::{EchoApi, PetStoreApi, API_KEY};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use typedapi::ids::RequestId;
use typedapi::security::{Credential, StaticCredentialsProvider};
use typedapi::{DispatchError, RequestHandler};

fn echo_handler() -> RequestHandler<EchoApi> {
    let handler = RequestHandler::new(EchoApi).unwrap();
    let provider = StaticCredentialsProvider::for_document(handler.document())
        .credential("apiKey", Credential::new(API_KEY, "alice"));
    handler.with_authentication_provider(provider)
}

fn issue_paths(body: &Value) -> Vec<Vec<Value>> {
    body["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["path"].as_array().unwrap().clone())
        .collect()
}

#[test]
fn test_pet_found() {
    let handler = RequestHandler::new(PetStoreApi::new()).unwrap();
    let response = handler.handle(&request("GET", "/pet/2")).unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(content_type(&response), Some("application/json"));
    assert_eq!(
        body_json(&response),
        json!({"id": 2, "name": "Second", "tag": "some-tag"})
    );
}

#[test]
fn test_scenario_c_unknown_pet_is_not_found_problem() {
    let handler = RequestHandler::new(PetStoreApi::new()).unwrap();
    let response = handler.handle(&request("GET", "/pet/999")).unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(content_type(&response), Some("application/problem+json"));
    assert_eq!(
        body_json(&response),
        json!({
            "type": "https://www.rfc-editor.org/rfc/rfc9110#name-404-not-found",
            "title": "Not Found"
        })
    );
}

#[test]
fn test_scenario_d_invalid_query_parameter() {
    let response = echo_handler()
        .handle(&request("GET", "/search?tag=NOT-VALID&limit=0"))
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(content_type(&response), Some("application/problem+json"));
    let body = body_json(&response);
    assert_eq!(body["title"], "Bad Request");
    // both parameters are reported
    let paths = issue_paths(&body);
    assert!(paths.contains(&vec![json!("query"), json!("tag")]));
    assert!(paths.contains(&vec![json!("query"), json!("limit")]));
}

#[test]
fn test_missing_required_parameter() {
    let response = echo_handler().handle(&request("GET", "/search")).unwrap();
    assert_eq!(response.status(), 400);
    let body = body_json(&response);
    assert_eq!(
        body["issues"],
        json!([{"code": "invalid_type", "message": "Required", "path": ["query", "tag"]}])
    );
}

#[test]
fn test_parameters_from_every_location() {
    let request = request("GET", "/search?tag=birds&limit=5&colors=red&colors=blue");
    let request = with_header(request, "x-trace", "trace-1");
    let request = with_header(request, "cookie", "session=s-42; theme=dark");
    let response = echo_handler().handle(&request).unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        body_json(&response),
        json!({
            "tag": "birds",
            "limit": 5,
            "colors": ["red", "blue"],
            "trace": "trace-1",
            "session": "s-42"
        })
    );
}

#[test]
fn test_optional_parameters_are_left_out() {
    let response = echo_handler()
        .handle(&request("GET", "/search?tag=birds"))
        .unwrap();
    assert_eq!(body_json(&response), json!({"tag": "birds"}));
}

#[test]
fn test_json_body_is_coerced() {
    let response = echo_handler()
        .handle(&json_request(
            "POST",
            "/items",
            &json!({"name": "bolt", "quantity": "12"}),
        ))
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(body_json(&response), json!({"name": "bolt", "quantity": 12}));
}

#[test]
fn test_invalid_body_reports_issues() {
    let response = echo_handler()
        .handle(&json_request(
            "POST",
            "/items",
            &json!({"name": "", "quantity": 5000, "colour": "red"}),
        ))
        .unwrap();
    assert_eq!(response.status(), 400);
    let body = body_json(&response);
    let paths = issue_paths(&body);
    assert!(paths.contains(&vec![json!("name")]));
    assert!(paths.contains(&vec![json!("quantity")]));
    assert!(body["issues"].as_array().unwrap().len() >= 2);
}

#[test]
fn test_body_content_type_problems() {
    let handler = echo_handler();
    let bad_request = |request: http::Request<Vec<u8>>| {
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.status(), 400);
        body_json(&response)["detail"].as_str().unwrap().to_string()
    };

    let missing = http::Request::builder()
        .method("POST")
        .uri("/items")
        .body(b"{}".to_vec())
        .unwrap();
    assert!(bad_request(missing).contains("Content-Type"));

    let malformed = with_header(request("POST", "/items"), "content-type", "json");
    assert!(bad_request(malformed).contains("Content-Type"));

    let unsupported = with_header(request("POST", "/items"), "content-type", "text/plain");
    assert!(bad_request(unsupported).contains("text/plain"));

    let mut broken = json_request("POST", "/items", &json!({}));
    *broken.body_mut() = b"{\"name\":".to_vec();
    assert!(bad_request(broken).contains("JSON"));
}

#[test]
fn test_body_limit() {
    let handler = echo_handler().with_max_body_bytes(16);
    let response = handler
        .handle(&json_request(
            "POST",
            "/items",
            &json!({"name": "a rather long item name", "quantity": 1}),
        ))
        .unwrap();
    assert_eq!(response.status(), 400);
    assert!(body_json(&response)["detail"]
        .as_str()
        .unwrap()
        .contains("16 bytes"));
}

#[test]
fn test_optional_body_may_be_empty() {
    let response = echo_handler().handle(&request("PUT", "/items/7")).unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(body_json(&response), json!({"id": 7}));

    let response = echo_handler()
        .handle(&json_request(
            "PUT",
            "/items/7",
            &json!({"name": "nut", "quantity": 3}),
        ))
        .unwrap();
    assert_eq!(
        body_json(&response),
        json!({"item": {"name": "nut", "quantity": 3}, "id": 7})
    );
}

#[test]
fn test_not_found_and_method_not_allowed_problems() {
    let handler = echo_handler();
    let response = handler.handle(&request("GET", "/nowhere")).unwrap();
    assert_eq!(response.status(), 404);

    let response = handler.handle(&request("PATCH", "/items")).unwrap();
    assert_eq!(response.status(), 405);
    assert_eq!(
        body_json(&response),
        json!({
            "type": "https://www.rfc-editor.org/rfc/rfc9110#name-405-method-not-allowed",
            "title": "Method Not Allowed"
        })
    );
}

#[test]
fn test_handler_error_is_internal_server_error_without_detail() {
    let handler = echo_handler();
    for path in ["/fail", "/explode"] {
        let response = handler.handle(&request("GET", path)).unwrap();
        assert_eq!(response.status(), 500, "{path}");
        let body = body_json(&response);
        assert_eq!(body["title"], "Internal Server Error");
        assert!(body.get("detail").is_none());
        assert!(!String::from_utf8_lossy(response.body()).contains("database"));
    }
    // the handler keeps serving after a panic
    let response = handler.handle(&request("GET", "/ping")).unwrap();
    assert_eq!(response.status(), 200);
}

#[test]
fn test_text_and_empty_results() {
    let handler = echo_handler();
    let response = handler.handle(&request("GET", "/ping")).unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(content_type(&response), None);
    assert_eq!(response.body(), b"pong");

    let response = handler.handle(&request("GET", "/nothing")).unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.body().is_empty());
}

#[test]
fn test_non_finite_float_is_bad_request() {
    let handler = echo_handler();
    for value in ["NaN", "inf", "-infinity"] {
        let response = handler
            .handle(&request("GET", &format!("/price?value={value}")))
            .unwrap();
        assert_eq!(response.status(), 400, "value={value}");
        let body = body_json(&response);
        assert_eq!(body["issues"][0]["code"], "invalid_type");
        assert_eq!(issue_paths(&body), vec![vec![json!("query"), json!("value")]]);
    }

    let response = handler.handle(&request("GET", "/price?value=2.5")).unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(body_json(&response), json!({"value": 2.5}));
}

#[test]
fn test_out_of_range_integer_is_bad_request() {
    let handler = echo_handler();
    for (limit, code) in [("-1", "too_small"), ("99999999999", "too_big"), ("1e300", "invalid_type")] {
        let response = handler
            .handle(&request("GET", &format!("/price?value=1&limit={limit}")))
            .unwrap();
        assert_eq!(response.status(), 400, "limit={limit}");
        let body = body_json(&response);
        assert_eq!(body["issues"][0]["code"], code, "limit={limit}");
        assert_eq!(issue_paths(&body), vec![vec![json!("query"), json!("limit")]]);
    }

    let response = handler
        .handle(&request("GET", "/price?value=1&limit=4294967295"))
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(body_json(&response)["limit"], json!(4_294_967_295_u32));
}

#[test]
fn test_repeated_wrapper_headers_survive_dispatch() {
    let response = echo_handler().handle(&request("GET", "/cookies")).unwrap();
    assert_eq!(response.status(), 200);
    let cookies: Vec<&str> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(cookies, ["a=1", "b=2"]);
    assert!(response.headers().contains_key("x-request-id"));
}

#[test]
fn test_scalar_json_result_is_fatal() {
    let err = echo_handler().handle(&request("GET", "/scalar")).unwrap_err();
    assert!(matches!(err, DispatchError::UnsupportedResult { ref handler, .. } if handler == "scalar"));
}

#[test]
fn test_missing_authentication_provider_is_fatal() {
    let handler = RequestHandler::new(EchoApi).unwrap();
    let err = handler.handle(&request("GET", "/me")).unwrap_err();
    assert_eq!(
        err,
        DispatchError::MissingAuthenticationProvider {
            handler: "me".to_string()
        }
    );
}

#[test]
fn test_request_id_is_echoed_or_minted() {
    let handler = echo_handler();
    let id = RequestId::new().to_string();
    let response = handler
        .handle(&with_header(request("GET", "/ping"), "x-request-id", &id))
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], id.as_str());

    let response = handler.handle(&request("GET", "/nowhere")).unwrap();
    let minted = response.headers()["x-request-id"].to_str().unwrap();
    assert_ne!(minted, id);
    assert!(minted.parse::<RequestId>().is_ok());
}

#[test]
fn test_concurrent_requests_share_one_handler() {
    let handler = Arc::new(RequestHandler::new(PetStoreApi::new()).unwrap());
    let workers: Vec<_> = (1..=8)
        .map(|i| {
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                let id = (i % 3) + 1;
                let response = handler.handle(&request("GET", &format!("/pet/{id}"))).unwrap();
                (id, body_json(&response)["id"].clone())
            })
        })
        .collect();
    for worker in workers {
        let (id, returned) = worker.join().unwrap();
        assert_eq!(returned, json!(id));
    }
}

#[test]
fn test_document_is_shared_with_router() {
    let handler = RequestHandler::new(PetStoreApi::new()).unwrap();
    assert!(Arc::ptr_eq(handler.document(), handler.router().document()));
    assert_eq!(handler.document().info.title, "Pet Store API");
}
