use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::config::JiraCredentials;
use crate::error::{LookupError, SyncError, SyncResult};
use crate::traits::ScrumSource;
use crate::{Sprint, Task};

#[derive(Debug, Deserialize)]
struct SprintPage {
    values: Vec<JiraSprint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraSprint {
    id: u64,
    end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    start_at: usize,
    #[serde(default)]
    total: usize,
    issues: Vec<JiraIssue>,
}

#[derive(Debug, Deserialize)]
struct JiraIssue {
    key: String,
    fields: JiraIssueFields,
}

#[derive(Debug, Deserialize)]
struct JiraIssueFields {
    summary: String,
    /// Remaining estimate of the issue and its sub-tasks, in seconds
    aggregatetimeestimate: Option<i64>,
}


/// A Jira (agile) board
pub struct JiraScrumBoard {
    http: reqwest::Client,
    credentials: JiraCredentials,
}

impl JiraScrumBoard {
    pub fn new(credentials: JiraCredentials) -> Self {
        Self { http: reqwest::Client::new(), credentials }
    }

    fn endpoint(&self, segments: &[&str]) -> SyncResult<Url> {
        let mut url = self.credentials.server.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::Configuration(format!("{} cannot be used as a Jira server URL", self.credentials.server)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> SyncResult<T> {
        let response = self.http
            .get(url)
            .query(query)
            .basic_auth(&self.credentials.owner, Some(&self.credentials.password))
            .send()
            .await?;
        let response = super::check_status(response).await?;
        Ok(response.json().await?)
    }

    /// The canonical URL of an issue
    fn browse_url(&self, key: &str) -> SyncResult<Url> {
        self.endpoint(&["browse", key])
    }
}

#[async_trait]
impl ScrumSource for JiraScrumBoard {
    async fn current_sprint(&self) -> SyncResult<Sprint> {
        let board = self.credentials.board.to_string();
        let url = self.endpoint(&["rest", "agile", "1.0", "board", &board, "sprint"])?;
        let page: SprintPage = self.get(url, &[("state", "active".to_string())]).await?;
        log::debug!("Found {} active sprints on board {}", page.values.len(), board);

        let mut sprints = page.values;
        if sprints.len() > 1 {
            return Err(SyncError::Conflict { marker: format!("active sprint of board {}", board), count: sprints.len() });
        }
        let sprint = sprints.pop().ok_or(LookupError::NoActiveSprint)?;
        let end_date = sprint.end_date
            .ok_or_else(|| SyncError::Transient(format!("active sprint {} has no end date", sprint.id)))?;
        Ok(Sprint::new(sprint.id.to_string(), end_date))
    }

    async fn current_sprint_tasks(&self, assignee: Option<&str>) -> SyncResult<Vec<Task>> {
        let assignee = assignee.unwrap_or(&self.credentials.owner);
        let sprint = self.current_sprint().await?;
        let query = jql(sprint.id(), assignee);
        let url = self.endpoint(&["rest", "api", "2", "search"])?;

        let mut tasks = Vec::new();
        loop {
            let page: SearchPage = self.get(url.clone(), &[
                ("jql", query.clone()),
                ("fields", "summary,aggregatetimeestimate".to_string()),
                ("startAt", tasks.len().to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
            ]).await?;
            let n_issues = page.issues.len();
            log::debug!("Got {} issues from index {} (out of {})", n_issues, page.start_at, page.total);

            for issue in page.issues {
                let estimate = issue.fields.aggregatetimeestimate.unwrap_or(0);
                let remaining = Duration::try_seconds(estimate)
                    .ok_or_else(|| SyncError::Transient(format!("issue {} has an out of range estimate ({}s)", issue.key, estimate)))?;
                let url = self.browse_url(&issue.key)?;
                tasks.push(Task::new(issue.key, issue.fields.summary, remaining, *sprint.end_date(), url));
            }

            if n_issues == 0 || page.start_at + n_issues >= page.total {
                break;
            }
        }
        Ok(tasks)
    }
}

const PAGE_SIZE: usize = 100;

/// The JQL query of the open issues of a sprint assigned to someone
fn jql(sprint_id: &str, assignee: &str) -> String {
    let assignee = assignee.replace('\\', "\\\\").replace('"', "\\\"");
    format!("status != Closed AND Sprint = {} AND assignee in (\"{}\")", sprint_id, assignee)
}
