//! Inject expectations: what the platform expects a collector to observe.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use bas_signatures::{Expectation, ExpectationReporter, ExpectationResult};

use crate::client::BasClient;
use crate::error::ClientError;

const PATH: &str = "/injects/expectations";

#[derive(Serialize)]
struct BulkUpdate<'a> {
    inputs: &'a HashMap<Uuid, ExpectationResult>,
}

pub struct InjectExpectationApi<'a> {
    client: &'a BasClient,
}

impl<'a> InjectExpectationApi<'a> {
    pub(crate) fn new(client: &'a BasClient) -> Self {
        Self { client }
    }

    /// Expectations that `source_id` has not reported on yet.
    ///
    /// `expiration_time` (minutes) narrows the result to expectations that
    /// have not expired within that window.
    pub async fn expectations_for_source(
        &self,
        source_id: &str,
        expiration_time: Option<u64>,
    ) -> Result<Vec<Expectation>, ClientError> {
        self.client
            .http_get(
                &format!("{PATH}/assets/{source_id}"),
                &expiration_query(expiration_time),
            )
            .await
    }

    pub async fn detection_expectations_for_source(
        &self,
        source_id: &str,
        expiration_time: Option<u64>,
    ) -> Result<Value, ClientError> {
        self.client
            .http_get(
                &format!("{PATH}/detection/{source_id}"),
                &expiration_query(expiration_time),
            )
            .await
    }

    pub async fn prevention_expectations_for_source(
        &self,
        source_id: &str,
    ) -> Result<Value, ClientError> {
        self.client
            .http_get(&format!("{PATH}/prevention/{source_id}"), &[])
            .await
    }

    pub async fn update(
        &self,
        expectation_id: Uuid,
        result: &ExpectationResult,
    ) -> Result<Value, ClientError> {
        self.client
            .http_put(&format!("{PATH}/{expectation_id}"), result)
            .await
    }

    /// Report several outcomes in one request.
    pub async fn bulk_update(
        &self,
        inputs: &HashMap<Uuid, ExpectationResult>,
    ) -> Result<(), ClientError> {
        let _: IgnoredAny = self
            .client
            .http_put(&format!("{PATH}/bulk"), &BulkUpdate { inputs })
            .await?;
        Ok(())
    }
}

fn expiration_query(expiration_time: Option<u64>) -> Vec<(&'static str, String)> {
    expiration_time
        .map(|minutes| ("expiration_time", minutes.to_string()))
        .into_iter()
        .collect()
}

#[async_trait]
impl ExpectationReporter for BasClient {
    type Error = ClientError;

    async fn update_expectation(
        &self,
        expectation_id: Uuid,
        result: &ExpectationResult,
    ) -> Result<(), ClientError> {
        self.inject_expectations()
            .update(expectation_id, result)
            .await
            .map(|_| ())
    }
}
