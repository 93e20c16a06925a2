use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::num::ParseIntError;
use std::str::FromStr;

/// Server-assigned user identifier.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Clone, Copy, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Server-assigned profile identifier.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Clone, Copy, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ProfileId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(UserId)
    }
}

/// A record exchanged with the backend and held by a list store.
///
/// `Key` is whatever the REST API addresses the entity by. For users that is
/// the user id; profiles are addressed by their owning user id.
pub trait Entity: Clone + Send + Sync + 'static {
    type Key: Copy + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static;
    type Draft: Draft;

    fn key(&self) -> Self::Key;

    /// Draft pre-filled from this entity, used by edit forms.
    fn to_draft(&self) -> Self::Draft;

    /// Copies over nested data a mutation response left out.
    ///
    /// Called when a freshly returned entity replaces `stored`.
    fn fill_from(&mut self, _stored: &Self) {}
}

/// The editable string fields of an entity.
///
/// Fields are bound by name so a form can drive any draft type.
pub trait Draft: Clone + Default + Serialize + Send + Sync + fmt::Debug + 'static {
    /// Form field names, in display order.
    fn fields() -> &'static [&'static str];

    fn value(&self, field: &str) -> Option<&str>;

    /// Returns false when `field` is not a field of this draft.
    fn set(&mut self, field: &str, value: String) -> bool;

    fn rules() -> &'static crate::validation::RuleSet;
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub phone: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl User {
    pub fn has_profile(&self) -> bool {
        self.profile.is_some()
    }
}

impl Entity for User {
    type Key = UserId;
    type Draft = UserDraft;

    fn key(&self) -> UserId {
        self.id
    }

    fn to_draft(&self) -> UserDraft {
        UserDraft {
            username: self.username.clone(),
            phone: self.phone.clone(),
        }
    }

    // A user PATCH may answer with the bare row.
    fn fill_from(&mut self, stored: &Self) {
        if self.profile.is_none() {
            self.profile = stored.profile.clone();
        }
    }
}

/// Owner summary embedded in a profile response.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Other,
    Custom(String),
}

impl Gender {
    /// Choices offered by profile forms, free text aside.
    pub const CHOICES: [&'static str; 3] = ["Male", "Female", "Other"];

    pub fn as_str(&self) -> &str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
            Gender::Custom(s) => s,
        }
    }
}

impl From<String> for Gender {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Male" => Gender::Male,
            "Female" => Gender::Female,
            "Other" => Gender::Other,
            _ => Gender::Custom(s),
        }
    }
}

impl From<Gender> for String {
    fn from(g: Gender) -> Self {
        match g {
            Gender::Custom(s) => s,
            g => g.as_str().to_string(),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Gender {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Gender::from)
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(try_from = "ProfileWire", rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub email: String,
    pub gender: Gender,
    pub address: String,
    pub pincode: String,
    pub city: String,
    pub state: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Profiles arrive either with `userId`, with an embedded `user`, or both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileWire {
    id: ProfileId,
    #[serde(default)]
    user_id: Option<UserId>,
    email: String,
    gender: Gender,
    address: String,
    pincode: String,
    city: String,
    state: String,
    country: String,
    #[serde(default)]
    user: Option<UserSummary>,
}

impl TryFrom<ProfileWire> for Profile {
    type Error = String;

    fn try_from(wire: ProfileWire) -> Result<Self, Self::Error> {
        let user_id = wire
            .user_id
            .or_else(|| wire.user.as_ref().map(|u| u.id))
            .ok_or_else(|| format!("profile {} has no owning user", wire.id))?;

        Ok(Profile {
            id: wire.id,
            user_id,
            email: wire.email,
            gender: wire.gender,
            address: wire.address,
            pincode: wire.pincode,
            city: wire.city,
            state: wire.state,
            country: wire.country,
            user: wire.user,
        })
    }
}

impl Entity for Profile {
    type Key = UserId;
    type Draft = ProfileDraft;

    fn key(&self) -> UserId {
        self.user_id
    }

    fn to_draft(&self) -> ProfileDraft {
        ProfileDraft {
            user_id: Some(self.user_id),
            email: self.email.clone(),
            gender: self.gender.to_string(),
            address: self.address.clone(),
            pincode: self.pincode.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
        }
    }

    fn fill_from(&mut self, stored: &Self) {
        if self.user.is_none() {
            self.user = stored.user.clone();
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct UserDraft {
    pub username: String,
    pub phone: String,
}

impl UserDraft {
    pub fn new(username: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            phone: phone.into(),
        }
    }
}

impl Draft for UserDraft {
    fn fields() -> &'static [&'static str] {
        &["username", "phone"]
    }

    fn value(&self, field: &str) -> Option<&str> {
        match field {
            "username" => Some(&self.username),
            "phone" => Some(&self.phone),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: String) -> bool {
        match field {
            "username" => self.username = value,
            "phone" => self.phone = value,
            _ => return false,
        }
        true
    }

    fn rules() -> &'static crate::validation::RuleSet {
        &crate::validation::USER_RULES
    }
}

/// Profile fields as typed into a form.
///
/// `user_id` is set once when the draft is created for a user and is not a
/// form field, so it can never be edited through `set`.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
    pub email: String,
    pub gender: String,
    pub address: String,
    pub pincode: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl ProfileDraft {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}

impl Draft for ProfileDraft {
    fn fields() -> &'static [&'static str] {
        &[
            "email", "gender", "address", "pincode", "city", "state", "country",
        ]
    }

    fn value(&self, field: &str) -> Option<&str> {
        match field {
            "email" => Some(&self.email),
            "gender" => Some(&self.gender),
            "address" => Some(&self.address),
            "pincode" => Some(&self.pincode),
            "city" => Some(&self.city),
            "state" => Some(&self.state),
            "country" => Some(&self.country),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "email" => &mut self.email,
            "gender" => &mut self.gender,
            "address" => &mut self.address,
            "pincode" => &mut self.pincode,
            "city" => &mut self.city,
            "state" => &mut self.state,
            "country" => &mut self.country,
            _ => return false,
        };
        *slot = value;
        true
    }

    fn rules() -> &'static crate::validation::RuleSet {
        &crate::validation::PROFILE_RULES
    }
}
