#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use anyhow::anyhow;
use anyhow::Result;
use reqwest::header::CONTENT_TYPE;
use tokio::task::AbortHandle;
use tokio::time;

use crate::domain::models::Heartbeat;
use crate::domain::models::HostEnvironment;
use crate::domain::models::LastHeartbeat;
use crate::domain::models::ProgressIndicator;
use crate::domain::models::Project;
use crate::domain::models::RawResponse;
use crate::domain::models::Reply;
use crate::domain::models::User;
use crate::domain::services::RequestHandle;
use crate::domain::services::RequestScheduler;
use crate::domain::services::TrackerContext;

const VALIDATION_POLL_INTERVAL: Duration = Duration::from_millis(50);
const VALIDATION_EXPECTED: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyValidation {
    /// No key given, nothing was sent.
    Empty,
    Valid(User),
    /// The server rejected the key with this error.
    Invalid(String),
    /// The request itself failed.
    Failed,
    Cancelled,
}

async fn read_response(res: reqwest::Response) -> Result<RawResponse> {
    let status = res.status().as_u16();
    let body = res.text().await?;

    return Ok(RawResponse::new(status, &body));
}

fn spawn_get(url: String, api_key: String) -> RequestHandle {
    return tokio::spawn(async move {
        let res = reqwest::Client::new()
            .get(url)
            .query(&[("api_key", api_key)])
            .send()
            .await?;

        return read_response(res).await;
    });
}

fn spawn_post(url: String, api_key: String, body: String) -> RequestHandle {
    return tokio::spawn(async move {
        // Without an explicit content type the body gets form encoded.
        let res = reqwest::Client::new()
            .post(url)
            .query(&[("api_key", api_key)])
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        return read_response(res).await;
    });
}

fn enqueue_list_projects(
    url: String,
    context: Arc<TrackerContext>,
    scheduler: &RequestScheduler,
    app_name: String,
) -> AbortHandle {
    let handle = spawn_get(url, context.api_key());
    let abort = handle.abort_handle();

    scheduler.enqueue(handle, move |res| {
        match res.and_then(|raw| return raw.reply::<Vec<Project>>()) {
            Ok(Reply::Accepted(projects)) => {
                on_projects(&context, projects, &app_name);
            }
            Ok(Reply::Rejected(err)) => {
                tracing::error!(error = err, "Failed to list projects");
            }
            Err(err) => {
                tracing::error!(error = ?err, "Failed to list projects");
            }
        }
    });

    return abort;
}

fn on_projects(context: &TrackerContext, projects: Vec<Project>, app_name: &str) {
    tracing::debug!(count = projects.len(), "Fetched projects");
    context.set_projects(projects);

    if context.active_project().is_none() && context.select_project_by_name(app_name) {
        tracing::info!(project = app_name, "Selected project matching the application name");
    }
}

pub struct ApiClient {
    url: String,
    context: Arc<TrackerContext>,
    scheduler: RequestScheduler,
    host: Arc<dyn HostEnvironment>,
}

impl ApiClient {
    pub fn new(
        url: &str,
        context: Arc<TrackerContext>,
        scheduler: RequestScheduler,
        host: Arc<dyn HostEnvironment>,
    ) -> ApiClient {
        return ApiClient {
            url: url.trim_end_matches('/').to_string(),
            context,
            scheduler,
            host,
        };
    }

    fn endpoint(&self, path: &str) -> String {
        return format!("{url}/{path}", url = self.url);
    }

    /// Checks the key against the current user endpoint and waits for the
    /// answer in the foreground, reporting progress until it arrives or the
    /// user cancels.
    pub async fn validate_key(&self, key: &str, progress: &dyn ProgressIndicator) -> KeyValidation {
        let key = key.trim();
        self.context.set_api_key(key);

        if key.is_empty() {
            self.context.set_key_validated(false);
            return KeyValidation::Empty;
        }

        let started = Instant::now();
        let handle = spawn_get(self.endpoint("users/current"), key.to_string());

        while !handle.is_finished() {
            let fraction =
                (started.elapsed().as_secs_f32() / VALIDATION_EXPECTED.as_secs_f32()).min(0.95);

            if progress.report("WakaTime", "Validating API key...", fraction) {
                handle.abort();
                progress.clear();
                tracing::info!("API key validation cancelled");
                return KeyValidation::Cancelled;
            }

            time::sleep(VALIDATION_POLL_INTERVAL).await;
        }
        progress.clear();

        let res = match handle.await {
            Ok(res) => res,
            Err(err) => Err(anyhow!("Request task failed: {err}")),
        };

        match res.and_then(|raw| return raw.reply::<User>()) {
            Ok(Reply::Accepted(user)) => {
                tracing::info!(user = user.label(), "API key validated");
                self.context.set_user(Some(user.clone()));
                self.context.set_key_validated(true);
                return KeyValidation::Valid(user);
            }
            Ok(Reply::Rejected(err)) => {
                tracing::error!(error = err, "API key was rejected");
                self.context.set_user(None);
                self.context.set_key_validated(false);
                return KeyValidation::Invalid(err);
            }
            Err(err) => {
                tracing::error!(error = ?err, "Failed to validate API key");
                self.context.set_key_validated(false);
                return KeyValidation::Failed;
            }
        }
    }

    /// Refreshes the cached project list through the scheduler. Returns the
    /// handle to cancel the request with, or `None` when no validated key is
    /// available.
    pub fn list_projects(&self) -> Option<AbortHandle> {
        if !self.context.is_key_validated() {
            tracing::debug!("API key not validated, not listing projects");
            return None;
        }

        tracing::debug!(
            user = ?self.context.user().map(|user| return user.label()),
            "Listing projects"
        );

        return Some(enqueue_list_projects(
            self.endpoint("users/current/projects"),
            self.context.clone(),
            &self.scheduler,
            self.host.application_name(),
        ));
    }

    /// Checks a key stored by an earlier session again, without waiting on
    /// it. Acceptance validates the key for this session and refreshes the
    /// project list, a rejection clears the validated flag. Transport
    /// failures keep whatever was stored. Returns `None` when no key is
    /// stored.
    pub fn revalidate_stored_key(&self) -> Option<AbortHandle> {
        let key = self.context.api_key();
        if key.is_empty() {
            tracing::debug!("No stored API key to check");
            return None;
        }

        let handle = spawn_get(self.endpoint("users/current"), key);
        let abort = handle.abort_handle();

        let context = self.context.clone();
        let scheduler = self.scheduler.clone();
        let projects_url = self.endpoint("users/current/projects");
        let app_name = self.host.application_name();
        self.scheduler.enqueue(handle, move |res| {
            match res.and_then(|raw| return raw.reply::<User>()) {
                Ok(Reply::Accepted(user)) => {
                    tracing::info!(user = user.label(), "Stored API key is valid");
                    context.set_user(Some(user));
                    context.set_key_validated(true);
                    enqueue_list_projects(projects_url, context, &scheduler, app_name);
                }
                Ok(Reply::Rejected(err)) => {
                    tracing::error!(error = err, "Stored API key was rejected");
                    context.set_user(None);
                    context.set_key_validated(false);
                }
                Err(err) => {
                    tracing::warn!(error = ?err, "Failed to check the stored API key");
                }
            }
        });

        return Some(abort);
    }

    /// Sends the heartbeat through the scheduler. Once the server confirms
    /// it, the echoed heartbeat becomes the new debounce reference.
    pub fn post_heartbeat(&self, heartbeat: &Heartbeat) -> Result<()> {
        let body = serde_json::to_string(heartbeat)?;
        tracing::debug!(body = body, "Sending heartbeat");

        let handle = spawn_post(
            self.endpoint("users/current/heartbeats"),
            self.context.api_key(),
            body,
        );

        let context = self.context.clone();
        self.scheduler.enqueue(handle, move |res| {
            match res.and_then(|raw| return raw.reply::<LastHeartbeat>()) {
                Ok(Reply::Accepted(last)) => {
                    tracing::debug!(id = last.id, entity = last.entity, "Heartbeat delivered");
                    context.record_heartbeat(last);
                }
                Ok(Reply::Rejected(err)) => {
                    tracing::warn!(
                        error = err,
                        "Heartbeat was rejected. If this keeps happening, please report it."
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        error = ?err,
                        "Failed to send heartbeat. If this keeps happening, please report it."
                    );
                }
            }
        });

        return Ok(());
    }
}
