use serde::{Deserialize, Serialize};
use tower::ServiceExt;

use tower_json_dispatch::{prelude::*, transport::read_raw_body, transport::BINARY_ELEMENT};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct DetailRequest {
    verbose: bool,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct User {
    user_id: i32,
    display_name: String,
    email: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("Tower JSON Dispatch GetUser Example\n");

    let descriptor = OperationDescriptor::builder("GetUser")
        .parameter("id", TypeRef::scalar::<i32>())
        .parameter("detail", TypeRef::json::<DetailRequest>())
        .returns(TypeRef::json::<User>())
        .uri_template("users/{id}")
        .build()?;

    let table = OperationTable::new().register(
        descriptor,
        operation_fn(|params: &ParameterSlots| {
            let id = params.get::<i32>(0).copied().unwrap_or_default();
            let verbose = params
                .get::<DetailRequest>(1)
                .map(|detail| detail.verbose)
                .unwrap_or_default();

            Ok(User {
                user_id: id,
                display_name: format!("User {id}"),
                email: verbose.then(|| format!("user{id}@example.com")),
            })
        }),
    )?;
    let service = DispatchService::new(table);

    for (id, body) in [("42", r#"{"verbose":true}"#), ("abc", "")] {
        let vars = BoundVariables::new().with("id", id);
        let message = Message::request(UriTemplateMatch::new(vars)).with_buffered_body(body);

        let reply = service
            .clone()
            .oneshot(DispatchRequest::new("GetUser", message))
            .await?;

        let body = read_raw_body(&reply, BINARY_ELEMENT)?;
        println!("GET users/{id} -> {}", String::from_utf8_lossy(&body));
    }

    let vars = BoundVariables::new().with("id", "7");
    let message = Message::request(UriTemplateMatch::new(vars)).with_buffered_body("{oops");
    let fault = service
        .dispatch_or_fault(DispatchRequest::new("GetUser", message))
        .await?;
    let body = read_raw_body(&fault, BINARY_ELEMENT)?;
    println!(
        "GET users/7 with a broken body -> {:?} {}",
        fault.http_response().map(|http| http.status),
        String::from_utf8_lossy(&body)
    );

    Ok(())
}
