use pivotrello_core::error::RemoteError;
use pivotrello_core::model::{
    BoardList, BoardMember, BoardSummary, Card, CheckItem, Checklist, Label, LabelColor, NewCard,
};
use pivotrello_core::remote::DestinationBoard;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub const TRELLO_API: &str = "https://api.trello.com/1";

const SERVICE: &str = "Trello";

const CARD_FIELDS: &str = "name,desc,idList,pos,idLabels,idMembers,url";

#[derive(Debug, Deserialize)]
struct WireBoard {
    id: String,
    name: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireList {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMember {
    id: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct WireLabel {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCard {
    id: String,
    name: String,
    #[serde(default)]
    desc: String,
    id_list: String,
    pos: f64,
    #[serde(default)]
    id_labels: Vec<String>,
    #[serde(default)]
    id_members: Vec<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    checklists: Vec<WireChecklist>,
    #[serde(default)]
    actions: Vec<WireAction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChecklist {
    id: String,
    name: String,
    #[serde(default)]
    check_items: Vec<WireCheckItem>,
}

#[derive(Debug, Deserialize)]
struct WireCheckItem {
    id: String,
    name: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct WireAction {
    #[serde(default)]
    data: WireActionData,
}

#[derive(Debug, Default, Deserialize)]
struct WireActionData {
    #[serde(default)]
    text: Option<String>,
}

impl From<WireLabel> for Label {
    fn from(wire: WireLabel) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            // Shades like `green_dark` have no counterpart here.
            color: wire.color.and_then(|color| color.parse().ok()),
        }
    }
}

impl From<WireCheckItem> for CheckItem {
    fn from(wire: WireCheckItem) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            complete: wire.state == "complete",
        }
    }
}

impl From<WireChecklist> for Checklist {
    fn from(wire: WireChecklist) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            items: wire.check_items.into_iter().map(CheckItem::from).collect(),
        }
    }
}

impl From<WireCard> for Card {
    fn from(wire: WireCard) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            desc: wire.desc,
            list_id: wire.id_list,
            pos: wire.pos,
            label_ids: wire.id_labels,
            member_ids: wire.id_members,
            checklists: wire.checklists.into_iter().map(Checklist::from).collect(),
            comments: wire
                .actions
                .into_iter()
                .filter_map(|action| action.data.text)
                .collect(),
            url: wire.url,
        }
    }
}

/// Trello REST client authenticated with an API key and token.
pub struct TrelloClient {
    agent: ureq::Agent,
    base_url: String,
    key: String,
    token: String,
    requests: usize,
}

impl TrelloClient {
    pub fn new(key: String, token: String) -> Self {
        Self {
            agent: super::agent(),
            base_url: TRELLO_API.to_string(),
            key,
            token,
            requests: 0,
        }
    }

    pub const fn request_count(&self) -> usize {
        self.requests
    }

    /// Free text goes in `form` so long descriptions never hit URL limits.
    fn call(
        &mut self,
        method: &str,
        path: &str,
        params: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<ureq::Response, RemoteError> {
        self.requests += 1;
        let url = format!("{}{path}", self.base_url);
        debug!(method, path, "trello request");

        let mut request = self
            .agent
            .request(method, &url)
            .query("key", &self.key)
            .query("token", &self.token);
        for (name, value) in params {
            request = request.query(name, value);
        }

        let sent = if form.is_empty() {
            request.call()
        } else {
            request.send_form(form)
        };
        sent.map_err(|err| super::classify(SERVICE, err))
    }

    fn json<T: DeserializeOwned>(
        &mut self,
        method: &str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let response = self.call(method, path, params, &[])?;
        super::read_json(SERVICE, response)
    }

    fn unit(&mut self, method: &str, path: &str, params: &[(&str, &str)]) -> Result<(), RemoteError> {
        self.call(method, path, params, &[]).map(drop)
    }
}

impl DestinationBoard for TrelloClient {
    fn boards(&mut self) -> Result<Vec<BoardSummary>, RemoteError> {
        let boards: Vec<WireBoard> = self.json(
            "GET",
            "/members/me/boards",
            &[("filter", "open"), ("fields", "name,url")],
        )?;
        Ok(boards
            .into_iter()
            .map(|board| BoardSummary {
                id: board.id,
                name: board.name,
                url: board.url,
            })
            .collect())
    }

    fn lists(&mut self, board_id: &str) -> Result<Vec<BoardList>, RemoteError> {
        let lists: Vec<WireList> = self.json(
            "GET",
            &format!("/boards/{board_id}/lists"),
            &[("filter", "open"), ("fields", "name")],
        )?;
        Ok(lists
            .into_iter()
            .map(|list| BoardList {
                id: list.id,
                name: list.name,
            })
            .collect())
    }

    fn members(&mut self, board_id: &str) -> Result<Vec<BoardMember>, RemoteError> {
        let members: Vec<WireMember> = self.json(
            "GET",
            &format!("/boards/{board_id}/members"),
            &[("fields", "fullName,username")],
        )?;
        Ok(members
            .into_iter()
            .map(|member| BoardMember {
                id: member.id,
                full_name: member.full_name,
                username: member.username,
            })
            .collect())
    }

    fn labels(&mut self, board_id: &str) -> Result<Vec<Label>, RemoteError> {
        let labels: Vec<WireLabel> = self.json(
            "GET",
            &format!("/boards/{board_id}/labels"),
            &[("fields", "name,color"), ("limit", "1000")],
        )?;
        Ok(labels.into_iter().map(Label::from).collect())
    }

    fn cards(&mut self, list_id: &str) -> Result<Vec<Card>, RemoteError> {
        let cards: Vec<WireCard> = self.json(
            "GET",
            &format!("/lists/{list_id}/cards"),
            &[
                ("fields", CARD_FIELDS),
                ("checklists", "all"),
                ("actions", "commentCard"),
                ("actions_limit", "1000"),
            ],
        )?;
        Ok(cards.into_iter().map(Card::from).collect())
    }

    fn create_card(&mut self, card: &NewCard) -> Result<Card, RemoteError> {
        let pos = card.pos.to_string();
        let response = self.call(
            "POST",
            "/cards",
            &[("idList", &card.list_id), ("pos", &pos)],
            &[("name", &card.name), ("desc", &card.desc)],
        )?;
        let created: WireCard = super::read_json(SERVICE, response)?;
        Ok(created.into())
    }

    fn move_card(&mut self, card_id: &str, list_id: &str) -> Result<(), RemoteError> {
        self.unit("PUT", &format!("/cards/{card_id}"), &[("idList", list_id)])
    }

    fn set_position(&mut self, card_id: &str, pos: f64) -> Result<(), RemoteError> {
        let pos = pos.to_string();
        self.unit("PUT", &format!("/cards/{card_id}"), &[("pos", &pos)])
    }

    fn create_label(
        &mut self,
        board_id: &str,
        name: &str,
        color: Option<LabelColor>,
    ) -> Result<Label, RemoteError> {
        let mut params = vec![("idBoard", board_id), ("name", name)];
        if let Some(color) = color {
            params.push(("color", color.as_str()));
        }
        let label: WireLabel = self.json("POST", "/labels", &params)?;
        Ok(label.into())
    }

    fn add_label(&mut self, card_id: &str, label_id: &str) -> Result<(), RemoteError> {
        self.unit(
            "POST",
            &format!("/cards/{card_id}/idLabels"),
            &[("value", label_id)],
        )
    }

    fn remove_label(&mut self, card_id: &str, label_id: &str) -> Result<(), RemoteError> {
        self.unit("DELETE", &format!("/cards/{card_id}/idLabels/{label_id}"), &[])
    }

    fn add_member(&mut self, card_id: &str, member_id: &str) -> Result<(), RemoteError> {
        self.unit(
            "POST",
            &format!("/cards/{card_id}/idMembers"),
            &[("value", member_id)],
        )
    }

    fn remove_member(&mut self, card_id: &str, member_id: &str) -> Result<(), RemoteError> {
        self.unit("DELETE", &format!("/cards/{card_id}/idMembers/{member_id}"), &[])
    }

    fn create_checklist(&mut self, card_id: &str, name: &str) -> Result<Checklist, RemoteError> {
        let checklist: WireChecklist =
            self.json("POST", "/checklists", &[("idCard", card_id), ("name", name)])?;
        Ok(checklist.into())
    }

    fn add_check_item(
        &mut self,
        checklist_id: &str,
        name: &str,
        complete: bool,
    ) -> Result<CheckItem, RemoteError> {
        let checked = if complete { "true" } else { "false" };
        let item: WireCheckItem = self.json(
            "POST",
            &format!("/checklists/{checklist_id}/checkItems"),
            &[("name", name), ("checked", checked)],
        )?;
        Ok(item.into())
    }

    fn add_comment(&mut self, card_id: &str, text: &str) -> Result<(), RemoteError> {
        self.call(
            "POST",
            &format!("/cards/{card_id}/actions/comments"),
            &[],
            &[("text", text)],
        )
        .map(drop)
    }

    fn delete_card(&mut self, card_id: &str) -> Result<(), RemoteError> {
        self.unit("DELETE", &format!("/cards/{card_id}"), &[])
    }

    fn archive_all_cards(&mut self, list_id: &str) -> Result<(), RemoteError> {
        self.unit("POST", &format!("/lists/{list_id}/archiveAllCards"), &[])
    }

    fn close_list(&mut self, list_id: &str) -> Result<(), RemoteError> {
        self.unit("PUT", &format!("/lists/{list_id}/closed"), &[("value", "true")])
    }
}
