mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use restbox::pipeline::{error_fn, request_fn, response_fn};
use restbox::{
    Chain, Filter, Payload, RequestFilter, RequestOptions, RestClient, RestError, RestRequest,
    RestResponse,
};
use serde_json::json;

use common::{MockTransport, json};

type Log = Arc<Mutex<Vec<String>>>;

fn client(transport: &MockTransport) -> RestClient {
    RestClient::builder("http://api.test")
        .transport(transport.clone())
        .force_uncached(false)
        .build()
}

#[test]
fn builtin_filters_are_registered() {
    let plain = client(&MockTransport::new());
    assert_eq!(plain.pipeline().len(Chain::Request), 1);
    assert_eq!(plain.pipeline().len(Chain::Response), 1);
    assert_eq!(plain.pipeline().len(Chain::Error), 1);

    let overriding = RestClient::builder("http://api.test")
        .transport(MockTransport::new())
        .method_override(true)
        .build();
    assert_eq!(overriding.pipeline().len(Chain::Request), 2);
}

#[tokio::test]
async fn filters_run_in_registration_order_once_per_call() {
    let log = Log::default();
    let transport = MockTransport::new();
    let client = client(&transport);

    for name in ["auth", "trace"] {
        let log = log.clone();
        client.on_request(Arc::new(request_fn(move |_: &mut RestRequest| {
            log.lock().unwrap().push(format!("request:{name}"));
            Ok(())
        })));
    }
    client.on_response(Arc::new(response_fn({
        let log = log.clone();
        move |_: &RestRequest, _: &mut RestResponse| {
            log.lock().unwrap().push("response".to_owned());
            Ok(())
        }
    })));
    client.on_error(Arc::new(error_fn({
        let log = log.clone();
        move |error: Option<RestError>, _: &RestRequest, _: &RestResponse| {
            log.lock().unwrap().push("error".to_owned());
            error
        }
    })));

    client.get("/todos", RequestOptions::new()).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        ["request:auth", "request:trace", "response", "error"]
    );
}

#[tokio::test]
async fn request_filters_run_before_params_are_attached() {
    let transport = MockTransport::new();
    let client = client(&transport);
    client.on_request(Arc::new(request_fn(|request: &mut RestRequest| {
        request.params.insert("api_key".to_owned(), json!("secret"));
        Ok(())
    })));

    client.get("/todos", RequestOptions::new()).await.unwrap();

    assert_eq!(transport.last().url, "http://api.test/todos.json?api_key=secret");
}

#[tokio::test]
async fn response_filters_see_decoded_data() {
    let transport = MockTransport::always(json(200, json!({"items": [1, 2], "total": 2})));
    let client = client(&transport);
    client.on_response(Arc::new(response_fn(
        |_: &RestRequest, response: &mut RestResponse| {
            if let Some(items) = response.data.as_json().and_then(|body| body.get("items")) {
                response.data = Payload::from(items.clone());
            }
            Ok(())
        },
    )));

    let data = client.get("/todos", RequestOptions::new()).await.unwrap();

    assert_eq!(data, Payload::from(json!([1, 2])));
}

#[tokio::test]
async fn error_filter_can_recover_from_failure() {
    let transport = MockTransport::always(json(404, json!({"error": "not found"})));
    let client = client(&transport);
    client.on_error(Arc::new(error_fn(
        |error: Option<RestError>, _: &RestRequest, response: &RestResponse| {
            match response.status_code {
                Some(404) => None,
                _ => error,
            }
        },
    )));

    let data = client.get("/todos/1", RequestOptions::new()).await.unwrap();

    assert_eq!(data, Payload::from(json!({"error": "not found"})));
}

#[tokio::test]
async fn error_filter_can_replace_error() {
    let transport = MockTransport::always(json(401, json!({"message": "expired"})));
    let client = client(&transport);
    client.on_error(Arc::new(error_fn(
        |error: Option<RestError>, _: &RestRequest, _: &RestResponse| {
            error.map(|err| match err.status_code() {
                Some(401) => RestError::filter("please sign in again"),
                _ => err,
            })
        },
    )));

    let err = client.get("/me", RequestOptions::new()).await.unwrap_err();

    assert_eq!(err, RestError::filter("please sign in again"));
}

struct Stamp(&'static str);

#[async_trait]
impl RequestFilter for Stamp {
    async fn on_request(&self, request: &mut RestRequest) -> Result<(), RestError> {
        request.params.insert("stamp".to_owned(), json!(self.0));
        Ok(())
    }
}

#[tokio::test]
async fn unuse_stops_a_filter_from_running() {
    let transport = MockTransport::new();
    let client = client(&transport);
    let stamp = Arc::new(Stamp("v1"));
    client.use_filter(Filter::Request(stamp.clone()));

    client.get("/todos", RequestOptions::new()).await.unwrap();
    assert!(client.unuse(&stamp));
    assert!(!client.unuse(&stamp));
    client.get("/todos", RequestOptions::new()).await.unwrap();

    let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        [
            "http://api.test/todos.json?stamp=v1",
            "http://api.test/todos.json"
        ]
    );
}

#[tokio::test]
async fn builder_filters_follow_builtins() {
    let transport = MockTransport::always(json(200, json!({"ok": true})));
    let client = RestClient::builder("http://api.test")
        .transport(transport.clone())
        .filter(Filter::Response(Arc::new(response_fn(
            |_: &RestRequest, response: &mut RestResponse| {
                assert!(response.data.as_json().is_some());
                Ok(())
            },
        ))))
        .build();

    assert_eq!(client.pipeline().len(Chain::Response), 2);
    client.get("/status", RequestOptions::new()).await.unwrap();
}
