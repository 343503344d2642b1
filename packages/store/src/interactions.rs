//! # Visitor interactions embedded in links
//!
//! Poll votes and form entries happen inside a rendered link, without a round
//! trip to the store.
//!
//! ## Polls
//!
//! [`vote`] and [`vote_many`] read the poll's current options, bump the chosen
//! tallies and write the whole options list back through
//! [`Editor::update_link`]. This is a plain read-modify-write: two sessions
//! voting on the same stored poll each save their own full options list, and
//! the later save wins. Nothing here detects or merges that; the page is
//! assumed to have one editor at a time.
//!
//! A poll whose `endDate` has passed rejects votes with
//! [`InteractionError::PollClosed`].
//!
//! ## Forms
//!
//! [`FormDraft`] holds what a visitor has typed into a form link. Submitting
//! validates the draft against the form's fields and hands back a
//! [`FormSubmission`]. Submissions are never written to the document or the
//! store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::document::Editor;
use crate::error::InteractionError;
use crate::models::{FieldType, FormPayload, LinkData, LinkType, LinkUpdate, PollPayload};

fn poll<'a>(editor: &'a Editor, link_id: &str) -> Result<&'a PollPayload, InteractionError> {
    let item = editor
        .link(link_id)
        .ok_or_else(|| InteractionError::LinkNotFound(link_id.to_string()))?;
    match &item.data {
        LinkData::Poll(poll) => Ok(poll),
        other => Err(InteractionError::WrongLinkType {
            id: link_id.to_string(),
            expected: LinkType::Poll,
            found: other.link_type(),
        }),
    }
}

/// Add one vote for `option_id` on the poll `link_id`.
pub fn vote(
    editor: &mut Editor,
    link_id: &str,
    option_id: &str,
    now: DateTime<Utc>,
) -> Result<(), InteractionError> {
    tally(editor, link_id, &[option_id], now)
}

/// Add one vote to each of `option_ids`. Only allowed on multi-select polls.
pub fn vote_many(
    editor: &mut Editor,
    link_id: &str,
    option_ids: &[&str],
    now: DateTime<Utc>,
) -> Result<(), InteractionError> {
    if option_ids.len() > 1 && !poll(editor, link_id)?.allow_multiple {
        return Err(InteractionError::MultipleNotAllowed);
    }
    tally(editor, link_id, option_ids, now)
}

fn tally(
    editor: &mut Editor,
    link_id: &str,
    option_ids: &[&str],
    now: DateTime<Utc>,
) -> Result<(), InteractionError> {
    let current = poll(editor, link_id)?;
    if current.is_closed(now) {
        return Err(InteractionError::PollClosed);
    }
    if option_ids.is_empty() {
        return Err(InteractionError::NothingSelected);
    }
    if let Some(missing) = option_ids
        .iter()
        .find(|id| !current.options.iter().any(|o| o.id == **id))
    {
        return Err(InteractionError::UnknownOption(missing.to_string()));
    }

    let mut updated = current.clone();
    for option in updated.options.iter_mut() {
        if option_ids.contains(&option.id.as_str()) {
            option.votes = option.votes.saturating_add(1);
        }
    }
    debug!(link_id, ?option_ids, "poll vote");
    editor.update_link(link_id, LinkUpdate::data(LinkData::Poll(updated)))?;
    Ok(())
}

/// A value typed into one form field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Checked(bool),
}

impl FieldValue {
    fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Checked(checked) => !checked,
        }
    }
}

/// A validated, submitted form.
#[derive(Clone, Debug, PartialEq)]
pub struct FormSubmission {
    pub link_id: String,
    /// Field id to value, only for fields that were filled in.
    pub values: BTreeMap<String, FieldValue>,
    pub submitted_at: DateTime<Utc>,
}

/// Transient input state of one form link.
#[derive(Clone, Debug, PartialEq)]
pub struct FormDraft {
    link_id: String,
    form: FormPayload,
    values: BTreeMap<String, FieldValue>,
}

impl FormDraft {
    /// Open a draft for the form link `link_id`.
    pub fn open(editor: &Editor, link_id: &str) -> Result<Self, InteractionError> {
        let item = editor
            .link(link_id)
            .ok_or_else(|| InteractionError::LinkNotFound(link_id.to_string()))?;
        match &item.data {
            LinkData::Form(form) => Ok(Self {
                link_id: link_id.to_string(),
                form: form.clone(),
                values: BTreeMap::new(),
            }),
            other => Err(InteractionError::WrongLinkType {
                id: link_id.to_string(),
                expected: LinkType::Form,
                found: other.link_type(),
            }),
        }
    }

    pub fn link_id(&self) -> &str {
        &self.link_id
    }

    pub fn value(&self, field_id: &str) -> Option<&FieldValue> {
        self.values.get(field_id)
    }

    pub fn set(&mut self, field_id: &str, value: FieldValue) -> Result<(), InteractionError> {
        if !self.form.form_fields.iter().any(|f| f.id == field_id) {
            return Err(InteractionError::UnknownField(field_id.to_string()));
        }
        self.values.insert(field_id.to_string(), value);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Validate and take the entered values, leaving the draft empty.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<FormSubmission, InteractionError> {
        for field in &self.form.form_fields {
            let value = self.values.get(&field.id).filter(|v| !v.is_blank());
            match value {
                None if field.required => {
                    return Err(InteractionError::MissingRequired(field.label.clone()));
                }
                Some(FieldValue::Text(text)) if field.field_type.is_choice() => {
                    let options = field.options.as_deref().unwrap_or_default();
                    if !options.iter().any(|o| o == text) {
                        return Err(InteractionError::InvalidChoice {
                            label: field.label.clone(),
                            value: text.clone(),
                        });
                    }
                }
                Some(FieldValue::Checked(_)) if field.field_type != FieldType::Checkbox => {
                    return Err(InteractionError::InvalidChoice {
                        label: field.label.clone(),
                        value: "checked".to_string(),
                    });
                }
                _ => {}
            }
        }

        let values = std::mem::take(&mut self.values)
            .into_iter()
            .filter(|(_, v)| !v.is_blank())
            .collect();
        debug!(link_id = %self.link_id, "form submitted");
        Ok(FormSubmission {
            link_id: self.link_id.clone(),
            values,
            submitted_at: now,
        })
    }
}
