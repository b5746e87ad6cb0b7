pub mod credential_service;
pub mod health_service;
pub mod oauth_client_factory;
pub mod token_broker;
