use console::Style;
use dialoguer::theme::ColorfulTheme;
use userdir_lib::{ApiError, FieldErrors, Profile, User, UserId};

/// Named style tokens shared by every page.
pub struct Theme {
    pub primary: Style,
    pub danger: Style,
    pub muted: Style,
    pub create_profile: Style,
    pub view_profile: Style,
    pub heading: Style,
    pub error: Style,
    pub prompt: ColorfulTheme,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Style::new().color256(111).bold(),
            danger: Style::new().color256(203).bold(),
            muted: Style::new().color256(244),
            create_profile: Style::new().color256(215),
            view_profile: Style::new().color256(153),
            heading: Style::new().bold().underlined(),
            error: Style::new().red(),
            prompt: ColorfulTheme::default(),
        }
    }
}

impl Theme {
    pub fn heading(&self, text: &str) -> String {
        self.heading.apply_to(text).to_string()
    }

    pub fn table_header(&self) -> String {
        self.muted
            .apply_to(format!("{:<6} {:<24} {:<12} {}", "ID", "USERNAME", "PHONE", "PROFILE"))
            .to_string()
    }

    pub fn user_row(&self, user: &User) -> String {
        let affordance = if user.has_profile() {
            self.view_profile.apply_to("view profile")
        } else {
            self.create_profile.apply_to("create profile")
        };
        format!(
            "{:<6} {:<24} {:<12} {}",
            user.id, user.username, user.phone, affordance
        )
    }

    pub fn profile_details(&self, profile: &Profile) -> Vec<String> {
        let username = profile
            .user
            .as_ref()
            .map(|u| u.username.as_str())
            .unwrap_or("-");
        [
            ("Username", username),
            ("Email", profile.email.as_str()),
            ("Gender", profile.gender.as_str()),
            ("Address", profile.address.as_str()),
            ("Pincode", profile.pincode.as_str()),
            ("City", profile.city.as_str()),
            ("State", profile.state.as_str()),
            ("Country", profile.country.as_str()),
        ]
        .iter()
        .map(|(label, value)| format!("{} {}", self.primary.apply_to(format!("{}:", label)), value))
        .collect()
    }

    pub fn field_errors(&self, errors: &FieldErrors) -> Vec<String> {
        errors
            .iter()
            .map(|(field, message)| {
                format!("  {} {}", self.error.apply_to(format!("{}:", label(field))), message)
            })
            .collect()
    }

    pub fn failure(&self, err: &ApiError) -> String {
        self.danger.apply_to(format!("Request failed: {}", err)).to_string()
    }

    pub fn success(&self, text: &str) -> String {
        self.primary.apply_to(text).to_string()
    }

    /// Outcome line for a confirmed profile delete.
    pub fn profile_removed(&self, user_id: UserId, outcome: &Result<(), ApiError>) -> String {
        match outcome {
            Ok(()) => self.success("Profile deleted"),
            Err(ApiError::NotFound) => self
                .error
                .apply_to(format!("Profile for user #{} not found", user_id))
                .to_string(),
            Err(e) => self.failure(e),
        }
    }
}

/// Display label for a draft field name.
pub fn label(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
