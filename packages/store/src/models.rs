//! # Domain models for a link page
//!
//! Defines the pieces a page is made of. All of them are plain data; mutation
//! goes through [`crate::Editor`] so the dirty flag stays accurate.
//!
//! ## Types
//!
//! | Type | Represents |
//! |------|-----------|
//! | [`Profile`] / [`ProfileUpdate`] | The page owner's name, bio and avatar, and a partial update of them. |
//! | [`Theme`] / [`ThemeUpdate`] | Colours, font and [`ButtonStyle`] of the page. |
//! | [`LinkItem`] | One entry of the ordered link list: an id plus a [`LinkData`] payload. |
//! | [`LinkData`] | Tagged union over the nine [`LinkType`]s, one payload record per kind. |
//!
//! ## Payload encoding
//!
//! Payloads cross the store boundary as an opaque JSON object next to a type tag
//! (see [`crate::repo::LinkRow`]). Field names are camelCase (`formFields`,
//! `allowMultiple`, `endDate`). [`LinkData::from_parts`] is the one place where a
//! tag and a JSON object are turned back into a payload, and it rejects objects
//! that do not fit the tag.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ModelError;

/// Generate a fresh link / option / field identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The page owner's public profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub bio: String,
    /// Image URI or an embedded `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Partial update for [`Profile`]. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    /// `Some(None)` clears the avatar.
    pub avatar: Option<Option<String>>,
}

impl ProfileUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    pub fn avatar(mut self, avatar: Option<String>) -> Self {
        self.avatar = Some(avatar);
        self
    }
}

impl Profile {
    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(bio) = update.bio {
            self.bio = bio;
        }
        if let Some(avatar) = update.avatar {
            self.avatar = avatar;
        }
    }
}

/// Shape of the link buttons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    #[default]
    Rounded,
    Pill,
    Square,
}

impl ButtonStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonStyle::Rounded => "rounded",
            ButtonStyle::Pill => "pill",
            ButtonStyle::Square => "square",
        }
    }
}

impl FromStr for ButtonStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rounded" => Ok(ButtonStyle::Rounded),
            "pill" => Ok(ButtonStyle::Pill),
            "square" => Ok(ButtonStyle::Square),
            other => Err(format!("unknown button style `{other}`")),
        }
    }
}

/// Visual theme of the page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub background_color: String,
    pub button_color: String,
    pub text_color: String,
    pub font_family: String,
    pub button_style: ButtonStyle,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background_color: "#f3f4f6".to_string(),
            button_color: "#4f46e5".to_string(),
            text_color: "#111827".to_string(),
            font_family: "Inter".to_string(),
            button_style: ButtonStyle::Rounded,
        }
    }
}

/// Partial update for [`Theme`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ThemeUpdate {
    pub background_color: Option<String>,
    pub button_color: Option<String>,
    pub text_color: Option<String>,
    pub font_family: Option<String>,
    pub button_style: Option<ButtonStyle>,
}

impl ThemeUpdate {
    pub fn background_color(mut self, color: impl Into<String>) -> Self {
        self.background_color = Some(color.into());
        self
    }

    pub fn button_color(mut self, color: impl Into<String>) -> Self {
        self.button_color = Some(color.into());
        self
    }

    pub fn text_color(mut self, color: impl Into<String>) -> Self {
        self.text_color = Some(color.into());
        self
    }

    pub fn font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn button_style(mut self, style: ButtonStyle) -> Self {
        self.button_style = Some(style);
        self
    }
}

impl Theme {
    pub fn apply(&mut self, update: ThemeUpdate) {
        if let Some(v) = update.background_color {
            self.background_color = v;
        }
        if let Some(v) = update.button_color {
            self.button_color = v;
        }
        if let Some(v) = update.text_color {
            self.text_color = v;
        }
        if let Some(v) = update.font_family {
            self.font_family = v;
        }
        if let Some(v) = update.button_style {
            self.button_style = v;
        }
    }
}

/// Discriminant of a [`LinkData`] payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Product,
    Link,
    Form,
    Folder,
    Image,
    Video,
    Podcast,
    Social,
    Poll,
}

impl LinkType {
    pub const ALL: [LinkType; 9] = [
        LinkType::Product,
        LinkType::Link,
        LinkType::Form,
        LinkType::Folder,
        LinkType::Image,
        LinkType::Video,
        LinkType::Podcast,
        LinkType::Social,
        LinkType::Poll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Product => "product",
            LinkType::Link => "link",
            LinkType::Form => "form",
            LinkType::Folder => "folder",
            LinkType::Image => "image",
            LinkType::Video => "video",
            LinkType::Podcast => "podcast",
            LinkType::Social => "social",
            LinkType::Poll => "poll",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LinkType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ModelError::UnknownLinkType(s.to_string()))
    }
}

/// Storefront the product was imported from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Shopify,
    WooCommerce,
}

/// An imported storefront product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub platform: Platform,
    pub url: String,
}

/// Payload shared by plain `link` and `social` entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPayload {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl LinkPayload {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            icon: None,
            description: None,
            thumbnail: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub title: String,
    /// Image URI or an embedded `data:` URI.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload shared by `video` and `podcast` entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl MediaPayload {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            thumbnail: None,
            description: None,
            duration: None,
        }
    }

    /// YouTube video id for `youtube.com/watch?v=<id>` and `youtu.be/<id>` URLs.
    pub fn youtube_id(&self) -> Option<String> {
        let url = Url::parse(&self.url).ok()?;
        let host = url.host_str()?;
        let id = if host.ends_with("youtube.com") {
            url.query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
        } else if host.ends_with("youtu.be") {
            url.path_segments()
                .and_then(|mut segments| segments.next())
                .map(str::to_string)
        } else {
            None
        };
        id.filter(|id| !id.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub id: String,
    pub title: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub links: Vec<FolderEntry>,
}

/// Input kind of a form field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
}

impl FieldType {
    /// Select and radio fields only accept one of their listed options.
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl FormField {
    pub fn new(label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: new_id(),
            label: label.into(),
            field_type,
            required: false,
            options: None,
            placeholder: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub form_fields: Vec<FormField>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub votes: u32,
}

impl PollOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            votes: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub question: String,
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "end_date"
    )]
    pub end_date: Option<DateTime<Utc>>,
}

/// Share of the total vote held by one poll option.
#[derive(Clone, Debug, PartialEq)]
pub struct PollShare {
    pub option_id: String,
    pub text: String,
    pub votes: u32,
    /// 0.0 to 100.0; 0.0 for every option while nobody has voted.
    pub percent: f64,
}

impl PollPayload {
    pub fn new<I, S>(question: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let question = question.into();
        Self {
            title: question.clone(),
            description: None,
            question,
            options: options.into_iter().map(PollOption::new).collect(),
            allow_multiple: false,
            end_date: None,
        }
    }

    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|o| u64::from(o.votes)).sum()
    }

    pub fn results(&self) -> Vec<PollShare> {
        let total = self.total_votes();
        self.options
            .iter()
            .map(|o| PollShare {
                option_id: o.id.clone(),
                text: o.text.clone(),
                votes: o.votes,
                percent: if total == 0 {
                    0.0
                } else {
                    f64::from(o.votes) * 100.0 / total as f64
                },
            })
            .collect()
    }

    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        self.end_date.is_some_and(|end| end < now)
    }
}

/// Parse a poll end date: RFC 3339, or the zone-less `YYYY-MM-DDTHH:MM[:SS]`
/// produced by browser date pickers (read as UTC).
pub fn parse_end_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

mod end_date {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(end) => serializer.serialize_some(&end.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_end_date(s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid poll end date `{s}`"))),
        }
    }
}

/// Payload of a [`LinkItem`], one variant per [`LinkType`].
#[derive(Clone, Debug, PartialEq)]
pub enum LinkData {
    Product(Product),
    Link(LinkPayload),
    Form(FormPayload),
    Folder(FolderPayload),
    Image(ImagePayload),
    Video(MediaPayload),
    Podcast(MediaPayload),
    Social(LinkPayload),
    Poll(PollPayload),
}

fn decode<T: DeserializeOwned>(link_type: LinkType, data: serde_json::Value) -> Result<T, ModelError> {
    serde_json::from_value(data).map_err(|e| ModelError::InvalidPayload {
        link_type,
        message: e.to_string(),
    })
}

fn invalid(link_type: LinkType, message: impl Into<String>) -> ModelError {
    ModelError::InvalidPayload {
        link_type,
        message: message.into(),
    }
}

impl LinkData {
    pub fn link_type(&self) -> LinkType {
        match self {
            LinkData::Product(_) => LinkType::Product,
            LinkData::Link(_) => LinkType::Link,
            LinkData::Form(_) => LinkType::Form,
            LinkData::Folder(_) => LinkType::Folder,
            LinkData::Image(_) => LinkType::Image,
            LinkData::Video(_) => LinkType::Video,
            LinkData::Podcast(_) => LinkType::Podcast,
            LinkData::Social(_) => LinkType::Social,
            LinkData::Poll(_) => LinkType::Poll,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            LinkData::Product(p) => &p.title,
            LinkData::Link(p) | LinkData::Social(p) => &p.title,
            LinkData::Form(p) => &p.title,
            LinkData::Folder(p) => &p.title,
            LinkData::Image(p) => &p.title,
            LinkData::Video(p) | LinkData::Podcast(p) => &p.title,
            LinkData::Poll(p) => &p.title,
        }
    }

    /// Decode a stored `(type, data)` pair.
    pub fn from_parts(link_type: LinkType, data: serde_json::Value) -> Result<Self, ModelError> {
        let parsed = match link_type {
            LinkType::Product => LinkData::Product(decode(link_type, data)?),
            LinkType::Link => LinkData::Link(decode(link_type, data)?),
            LinkType::Form => LinkData::Form(decode(link_type, data)?),
            LinkType::Folder => LinkData::Folder(decode(link_type, data)?),
            LinkType::Image => LinkData::Image(decode(link_type, data)?),
            LinkType::Video => LinkData::Video(decode(link_type, data)?),
            LinkType::Podcast => LinkData::Podcast(decode(link_type, data)?),
            LinkType::Social => LinkData::Social(decode(link_type, data)?),
            LinkType::Poll => LinkData::Poll(decode(link_type, data)?),
        };
        parsed.validate()?;
        Ok(parsed)
    }

    /// Encode the payload for the opaque `data` column.
    pub fn to_value(&self) -> Result<serde_json::Value, ModelError> {
        let encoded = match self {
            LinkData::Product(p) => serde_json::to_value(p),
            LinkData::Link(p) | LinkData::Social(p) => serde_json::to_value(p),
            LinkData::Form(p) => serde_json::to_value(p),
            LinkData::Folder(p) => serde_json::to_value(p),
            LinkData::Image(p) => serde_json::to_value(p),
            LinkData::Video(p) | LinkData::Podcast(p) => serde_json::to_value(p),
            LinkData::Poll(p) => serde_json::to_value(p),
        };
        encoded.map_err(|e| invalid(self.link_type(), e.to_string()))
    }

    /// Check the requirements serde cannot express.
    pub fn validate(&self) -> Result<(), ModelError> {
        let link_type = self.link_type();
        match self {
            LinkData::Link(LinkPayload { url, .. })
            | LinkData::Social(LinkPayload { url, .. })
            | LinkData::Image(ImagePayload { url, .. })
            | LinkData::Video(MediaPayload { url, .. })
            | LinkData::Podcast(MediaPayload { url, .. })
            | LinkData::Product(Product { url, .. }) => {
                if url.trim().is_empty() {
                    return Err(invalid(link_type, "url is required"));
                }
                if let LinkData::Product(product) = self {
                    if !product.price.is_finite() {
                        return Err(invalid(link_type, "price must be a finite number"));
                    }
                }
            }
            LinkData::Poll(poll) => {
                if poll.options.is_empty() {
                    return Err(invalid(link_type, "a poll needs at least one option"));
                }
                if has_duplicates(poll.options.iter().map(|o| o.id.as_str())) {
                    return Err(invalid(link_type, "poll option ids must be unique"));
                }
            }
            LinkData::Form(form) => {
                if has_duplicates(form.form_fields.iter().map(|f| f.id.as_str())) {
                    return Err(invalid(link_type, "form field ids must be unique"));
                }
            }
            LinkData::Folder(_) => {}
        }
        Ok(())
    }
}

fn has_duplicates<'a>(ids: impl Iterator<Item = &'a str>) -> bool {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().any(|id| !seen.insert(id))
}

/// One entry in the page's ordered link list.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkItem {
    pub id: String,
    pub data: LinkData,
}

impl LinkItem {
    /// Wrap a payload under a freshly generated id.
    pub fn new(data: LinkData) -> Self {
        Self { id: new_id(), data }
    }

    pub fn with_id(id: impl Into<String>, data: LinkData) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn link_type(&self) -> LinkType {
        self.data.link_type()
    }

    pub fn title(&self) -> &str {
        self.data.title()
    }
}

/// Partial update for a [`LinkItem`]. The id never changes; the type follows
/// the payload, so replacing `data` may change the item's kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkUpdate {
    pub data: Option<LinkData>,
}

impl LinkUpdate {
    pub fn data(data: LinkData) -> Self {
        Self { data: Some(data) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_link_type_roundtrip() {
        for t in LinkType::ALL {
            assert_eq!(t.as_str().parse::<LinkType>().unwrap(), t);
        }
        assert_eq!(
            "banner".parse::<LinkType>(),
            Err(ModelError::UnknownLinkType("banner".to_string()))
        );
    }

    #[test]
    fn test_poll_payload_decodes_camel_case() {
        let data = json!({
            "title": "Lunch",
            "question": "Pizza or tacos?",
            "options": [
                {"id": "a", "text": "Pizza", "votes": 3},
                {"id": "b", "text": "Tacos", "votes": 1}
            ],
            "allowMultiple": true,
            "endDate": "2030-01-01T12:00"
        });
        let LinkData::Poll(poll) = LinkData::from_parts(LinkType::Poll, data).unwrap() else {
            panic!("expected a poll");
        };
        assert!(poll.allow_multiple);
        assert_eq!(poll.options[0].votes, 3);
        assert_eq!(poll.end_date, parse_end_date("2030-01-01T12:00:00Z"));
    }

    #[test]
    fn test_payload_must_match_type() {
        // A plain link has no question/options, so it cannot be read as a poll.
        let data = json!({"title": "Blog", "url": "https://example.com"});
        let err = LinkData::from_parts(LinkType::Poll, data.clone()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidPayload { link_type: LinkType::Poll, .. }
        ));

        let form = json!({"title": "Contact"});
        assert!(LinkData::from_parts(LinkType::Form, form).is_err());

        assert!(LinkData::from_parts(LinkType::Link, data).is_ok());
    }

    #[test]
    fn test_generic_link_requires_url() {
        let data = json!({"title": "Nowhere", "url": "  "});
        assert!(LinkData::from_parts(LinkType::Social, data).is_err());
    }

    #[test]
    fn test_product_price_must_be_finite() {
        let mut product = Product {
            id: "1".to_string(),
            title: "Mug".to_string(),
            price: f64::NAN,
            image: None,
            platform: Platform::WooCommerce,
            url: "https://woo.example/mug".to_string(),
        };
        assert!(LinkData::Product(product.clone()).validate().is_err());
        product.price = f64::INFINITY;
        assert!(LinkData::Product(product.clone()).validate().is_err());
        product.price = 4.0;
        assert_eq!(LinkData::Product(product).validate(), Ok(()));
    }

    #[test]
    fn test_negative_votes_rejected() {
        let data = json!({
            "title": "Q",
            "question": "Q",
            "options": [{"id": "a", "text": "A", "votes": -1}]
        });
        assert!(LinkData::from_parts(LinkType::Poll, data).is_err());
    }

    #[test]
    fn test_to_value_uses_stored_field_names() {
        let form = FormPayload {
            title: "Contact".to_string(),
            description: None,
            form_fields: vec![FormField {
                id: "f1".to_string(),
                label: "Email".to_string(),
                field_type: FieldType::Email,
                required: true,
                options: None,
                placeholder: None,
            }],
        };
        let value = LinkData::Form(form).to_value().unwrap();
        assert_eq!(value["formFields"][0]["type"], "email");
        assert_eq!(value["formFields"][0]["required"], true);
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_poll_results() {
        let mut poll = PollPayload::new("Best day?", ["Sat", "Sun"]);
        assert!(poll.results().iter().all(|s| s.percent == 0.0));

        poll.options[0].votes = 3;
        poll.options[1].votes = 1;
        let results = poll.results();
        assert_eq!(poll.total_votes(), 4);
        assert_eq!(results[0].percent, 75.0);
        assert_eq!(results[1].percent, 25.0);
    }

    #[test]
    fn test_poll_closed() {
        let mut poll = PollPayload::new("Q", ["A"]);
        let now = Utc::now();
        assert!(!poll.is_closed(now));
        poll.end_date = Some(now - chrono::Duration::hours(1));
        assert!(poll.is_closed(now));
        poll.end_date = Some(now + chrono::Duration::hours(1));
        assert!(!poll.is_closed(now));
    }

    #[test]
    fn test_youtube_id() {
        let watch = MediaPayload::new("Talk", "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1");
        assert_eq!(watch.youtube_id().as_deref(), Some("dQw4w9WgXcQ"));

        let short = MediaPayload::new("Talk", "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(short.youtube_id().as_deref(), Some("dQw4w9WgXcQ"));

        let other = MediaPayload::new("Talk", "https://vimeo.com/123");
        assert_eq!(other.youtube_id(), None);

        let garbage = MediaPayload::new("Talk", "not a url");
        assert_eq!(garbage.youtube_id(), None);
    }

    #[test]
    fn test_profile_and_theme_partial_update() {
        let mut profile = Profile::default();
        profile.apply(ProfileUpdate::default().name("Ada").avatar(Some("a.png".into())));
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.bio, "");
        assert_eq!(profile.avatar.as_deref(), Some("a.png"));

        let mut theme = Theme::default();
        theme.apply(ThemeUpdate::default().button_style(ButtonStyle::Pill));
        assert_eq!(theme.button_style, ButtonStyle::Pill);
        assert_eq!(theme.font_family, "Inter");
    }
}
