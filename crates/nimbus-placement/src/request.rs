//! Deployment requests.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::application::{Application, VmTemplate};
use crate::error::{ConfigError, DeployerError};
use crate::topology::Identifiable;

/// Prefix of generated request IDs.
pub const REQUEST_ID_PREFIX: &str = "request";

/// Request to place a number of machines of each template for one application.
///
/// Every referenced template is known to the application, which is checked when the request is built.
#[derive(Debug, Clone)]
pub struct DeploymentRequest<'a> {
    id: String,
    application: &'a Application,
    requests: IndexMap<String, u32>,
}

impl<'a> DeploymentRequest<'a> {
    pub fn builder() -> DeploymentRequestBuilder<'a> {
        DeploymentRequestBuilder::new()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn application(&self) -> &'a Application {
        self.application
    }

    /// Returns requested templates with their counts, in the order they were added.
    pub fn template_requests(&self) -> impl Iterator<Item = (&'a VmTemplate, u32)> + '_ {
        let application = self.application;
        self.requests
            .iter()
            .filter_map(move |(id, count)| application.template(id).map(|template| (template, *count)))
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Returns the total number of requested machines.
    pub fn total_requested(&self) -> u32 {
        self.requests.values().sum()
    }
}

/// Builder of [`DeploymentRequest`].
#[derive(Debug, Clone, Default)]
pub struct DeploymentRequestBuilder<'a> {
    id: Option<String>,
    application: Option<&'a Application>,
    requests: IndexMap<String, u32>,
}

impl<'a> DeploymentRequestBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_application(mut self, application: &'a Application) -> Self {
        self.application = Some(application);
        self
    }

    /// Requests `count` machines of the template. Repeating a template replaces its count.
    pub fn with_request(mut self, template: &str, count: u32) -> Self {
        self.requests.insert(template.to_string(), count);
        self
    }

    pub fn with_requests<'t, I>(mut self, requests: I) -> Self
    where
        I: IntoIterator<Item = (&'t str, u32)>,
    {
        for (template, count) in requests {
            self.requests.insert(template.to_string(), count);
        }
        self
    }

    /// Builds the request.
    ///
    /// Fails with a contract error if no application is set and with a configuration error if a template is not
    /// known to the application.
    pub fn build(self) -> Result<DeploymentRequest<'a>, DeployerError> {
        let application = self
            .application
            .ok_or_else(|| DeployerError::Contract("deployment request has no application".to_string()))?;
        if let Some(unknown) = self.requests.keys().find(|id| application.template(id).is_none()) {
            return Err(ConfigError::UnknownTemplate {
                application: application.id().to_string(),
                template: unknown.clone(),
            }
            .into());
        }
        Ok(DeploymentRequest {
            id: self
                .id
                .unwrap_or_else(|| format!("{}-{}", REQUEST_ID_PREFIX, Uuid::new_v4())),
            application,
            requests: self.requests,
        })
    }
}
