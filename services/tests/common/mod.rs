//! Shared helpers for the integration tests.

use axum_test::TestServer;
use serde_json::{Value, json};
use usuarios_services::{config::Config, routes, usuarios::MockUsuarioStorage};

/// Builds a test server over the given in-memory storage.
pub fn create_test_server(storage: MockUsuarioStorage) -> TestServer {
    create_test_server_with_config(storage, Config::new_for_test())
}

#[allow(dead_code)]
pub fn create_test_server_with_config(storage: MockUsuarioStorage, config: Config) -> TestServer {
    TestServer::new(routes(storage, config)).expect("Failed to create test server")
}

/// JSON body for a valid user without a bank.
#[allow(dead_code)]
pub fn usuario_json(cedula: &str, nombre: &str) -> Value {
    json!({
        "cedula": cedula,
        "nombre": nombre,
        "salario": 1000.0,
        "fecha_nacimiento": "1990-01-01",
        "fecha_ingreso": "2020-01-01",
        "cargo": "Dev"
    })
}
