use pivotrello_core::error::RemoteError;
use pivotrello_core::model::{Person, Project, Story, StoryKind, StoryState, Task};
use pivotrello_core::remote::SourceTracker;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub const PIVOTAL_API: &str = "https://www.pivotaltracker.com/services/v5";

const SERVICE: &str = "Pivotal Tracker";

/// Largest page the stories endpoint returns.
const PAGE_SIZE: usize = 500;

const STORY_FIELDS: &str = "id,name,description,story_type,current_state,estimate,owner_ids,\
labels(name),comments(text),tasks(description,complete),before_id,after_id";

#[derive(Debug, Deserialize)]
struct WireProject {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireStory {
    id: u64,
    name: String,
    #[serde(default)]
    description: Option<String>,
    story_type: StoryKind,
    current_state: StoryState,
    #[serde(default)]
    estimate: Option<i64>,
    #[serde(default)]
    owner_ids: Vec<u64>,
    #[serde(default)]
    labels: Vec<WireLabel>,
    #[serde(default)]
    comments: Vec<WireComment>,
    #[serde(default)]
    tasks: Vec<WireTask>,
    #[serde(default)]
    before_id: Option<u64>,
    #[serde(default)]
    after_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireComment {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTask {
    description: String,
    #[serde(default)]
    complete: bool,
}

#[derive(Debug, Deserialize)]
struct WireMembership {
    person: WirePerson,
}

#[derive(Debug, Deserialize)]
struct WirePerson {
    id: u64,
    name: String,
    #[serde(default)]
    username: Option<String>,
}

impl From<WireStory> for Story {
    fn from(wire: WireStory) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            description: wire.description.unwrap_or_default(),
            kind: wire.story_type,
            state: wire.current_state,
            estimate: wire.estimate,
            owner_ids: wire.owner_ids,
            labels: wire.labels.into_iter().map(|label| label.name).collect(),
            comments: wire
                .comments
                .into_iter()
                .filter_map(|comment| comment.text)
                .collect(),
            tasks: wire
                .tasks
                .into_iter()
                .map(|task| Task {
                    description: task.description,
                    complete: task.complete,
                })
                .collect(),
            before_id: wire.before_id,
            after_id: wire.after_id,
        }
    }
}

/// Read-only Pivotal Tracker v5 client.
pub struct PivotalClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
    requests: usize,
}

impl PivotalClient {
    pub fn new(token: String) -> Self {
        Self {
            agent: super::agent(),
            base_url: PIVOTAL_API.to_string(),
            token,
            requests: 0,
        }
    }

    pub const fn request_count(&self) -> usize {
        self.requests
    }

    fn get_json<T: DeserializeOwned>(
        &mut self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        self.requests += 1;
        let url = format!("{}{path}", self.base_url);
        debug!(path, "pivotal request");

        let mut request = self.agent.get(&url).set("X-TrackerToken", &self.token);
        for (name, value) in params {
            request = request.query(name, value);
        }

        let response = request.call().map_err(|err| super::classify(SERVICE, err))?;
        super::read_json(SERVICE, response)
    }
}

impl SourceTracker for PivotalClient {
    fn projects(&mut self) -> Result<Vec<Project>, RemoteError> {
        let projects: Vec<WireProject> = self.get_json("/projects", &[])?;
        Ok(projects
            .into_iter()
            .map(|project| Project {
                id: project.id,
                name: project.name,
            })
            .collect())
    }

    fn stories(&mut self, project_id: u64) -> Result<Vec<Story>, RemoteError> {
        let path = format!("/projects/{project_id}/stories");
        let limit = PAGE_SIZE.to_string();
        let mut stories = Vec::new();
        let mut offset = 0_usize;

        loop {
            let offset_param = offset.to_string();
            let batch: Vec<WireStory> = self.get_json(
                &path,
                &[
                    ("fields", STORY_FIELDS),
                    ("limit", &limit),
                    ("offset", &offset_param),
                ],
            )?;

            let fetched = batch.len();
            stories.extend(batch.into_iter().map(Story::from));
            if fetched < PAGE_SIZE {
                break;
            }
            offset += fetched;
        }

        debug!(project_id, stories = stories.len(), "fetched stories");
        Ok(stories)
    }

    fn people(&mut self, project_id: u64) -> Result<Vec<Person>, RemoteError> {
        let memberships: Vec<WireMembership> =
            self.get_json(&format!("/projects/{project_id}/memberships"), &[])?;
        Ok(memberships
            .into_iter()
            .map(|membership| Person {
                id: membership.person.id,
                name: membership.person.name,
                username: membership.person.username,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_payload_decodes_into_model() {
        let raw = r#"{
            "id": 555,
            "name": "Login page",
            "description": "As a user",
            "story_type": "feature",
            "current_state": "started",
            "estimate": 3,
            "owner_ids": [7, 8],
            "labels": [{"name": "auth"}],
            "comments": [{"text": "looks good"}, {}],
            "tasks": [{"description": "form", "complete": true}],
            "before_id": 556,
            "after_id": 554
        }"#;
        let wire: WireStory = serde_json::from_str(raw).expect("decode");
        let story = Story::from(wire);

        assert_eq!(story.id, 555);
        assert_eq!(story.kind, StoryKind::Feature);
        assert_eq!(story.state, StoryState::Started);
        assert_eq!(story.estimate, Some(3));
        assert_eq!(story.owner_ids, vec![7, 8]);
        assert_eq!(story.labels, vec!["auth".to_string()]);
        assert_eq!(story.comments, vec!["looks good".to_string()]);
        assert!(story.tasks[0].complete);
        assert_eq!(story.before_id, Some(556));
        assert_eq!(story.after_id, Some(554));
    }

    #[test]
    fn sparse_story_uses_defaults() {
        let raw = r#"{"id": 1, "name": "Bare", "story_type": "chore", "current_state": "someday"}"#;
        let story = Story::from(serde_json::from_str::<WireStory>(raw).expect("decode"));

        assert_eq!(story.description, "");
        assert_eq!(story.state, StoryState::Unknown);
        assert_eq!(story.estimate, None);
        assert!(story.before_id.is_none() && story.after_id.is_none());
    }

    #[test]
    fn membership_payload_decodes() {
        let raw = r#"[{"person": {"id": 7, "name": "Ada", "username": "ada"}}]"#;
        let memberships: Vec<WireMembership> = serde_json::from_str(raw).expect("decode");
        assert_eq!(memberships[0].person.id, 7);
        assert_eq!(memberships[0].person.username.as_deref(), Some("ada"));
    }
}
