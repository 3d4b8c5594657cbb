pub mod schema_impl;

use actix_web::web;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::auth::AuthenticatedUser;

pub use schema_impl::{create_schema, MutationRoot, QueryRoot, Schema};

/// Executes a GraphQL request with the caller's claims in the request data.
pub async fn graphql_handler(
    schema: web::Data<Schema>,
    auth: AuthenticatedUser,
    request: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(request.into_inner().data(auth.0)).await.into()
}
