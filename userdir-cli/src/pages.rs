use crate::prompt::{self, run_form};
use crate::theme::Theme;
use dialoguer::Select;
use tracing::{info, warn};
use userdir_lib::{
    ApiError, ConfirmationGate, FormController, HttpClient, ListStore, Profile, ProfileDraft,
    Resource, StoreError, User, UserId,
};

/// The directory and the pages reachable from it.
pub struct App {
    api: HttpClient,
    users: ListStore<User>,
    user_gate: ConfirmationGate<UserId>,
    profile_gate: ConfirmationGate<UserId>,
    theme: Theme,
}

impl App {
    pub fn new(api: HttpClient, theme: Theme) -> Self {
        Self {
            api,
            users: ListStore::new(),
            user_gate: ConfirmationGate::new(),
            profile_gate: ConfirmationGate::new(),
            theme,
        }
    }

    /// Refreshes the listing, offering a retry on failure.
    async fn reload(&self) -> anyhow::Result<bool> {
        loop {
            match self.users.refresh(&self.api).await {
                Ok(_) => return Ok(true),
                Err(e) => {
                    println!("{}", self.theme.failure(&e));
                    if !prompt::confirm("Retry?", &self.theme)? {
                        return Ok(false);
                    }
                }
            }
        }
    }

    fn print_directory(&self) {
        println!("{}", self.theme.heading("Users Directory"));
        println!("{}", self.theme.table_header());
        for user in self.users.snapshot() {
            println!("{}", self.theme.user_row(&user));
        }
        if self.users.is_empty() {
            println!("{}", self.theme.muted.apply_to("(no users yet)"));
        }
    }

    pub async fn list(&self) -> anyhow::Result<()> {
        self.users.refresh(&self.api).await?;
        self.print_directory();
        Ok(())
    }

    pub async fn browse(&mut self) -> anyhow::Result<()> {
        loop {
            if !self.reload().await? {
                return Ok(());
            }
            self.print_directory();

            let users = self.users.snapshot();
            let mut items = vec!["Create user".to_string()];
            items.extend(users.iter().map(|u| format!("{} (#{})", u.username, u.id)));
            items.push("Refresh".to_string());
            items.push("Quit".to_string());

            let picked = Select::with_theme(&self.theme.prompt)
                .with_prompt("Choose")
                .items(&items)
                .default(0)
                .interact()?;

            match picked {
                0 => self.create_user().await?,
                i if i <= users.len() => self.user_menu(users[i - 1].id).await?,
                i if i == users.len() + 1 => continue,
                _ => {
                    self.users.abandon();
                    return Ok(());
                }
            }
        }
    }

    async fn user_menu(&mut self, id: UserId) -> anyhow::Result<()> {
        let Some(user) = self.users.find_by_id(id) else {
            println!("{}", self.theme.error.apply_to("That user is no longer listed"));
            return Ok(());
        };

        let profile_action = if user.has_profile() {
            "View profile"
        } else {
            "Create profile"
        };
        let items = ["Edit", "Delete", profile_action, "Back"];
        let picked = Select::with_theme(&self.theme.prompt)
            .with_prompt(format!("{} (#{})", user.username, user.id))
            .items(&items)
            .default(0)
            .interact()?;

        match picked {
            0 => self.edit_user(id).await,
            1 => self.delete_user(id).await,
            2 if user.has_profile() => self.profile(id).await,
            2 => self.create_profile(id).await,
            _ => Ok(()),
        }
    }

    pub async fn create_user(&mut self) -> anyhow::Result<()> {
        println!("{}", self.theme.heading("Create User"));
        let mut form = FormController::<User>::create();
        if let Some(user) = run_form(&mut form, &self.api, Some(&self.users), &self.theme).await? {
            info!(id = %user.id, "user created");
            println!("{}", self.theme.success(&format!("Created {} (#{})", user.username, user.id)));
        }
        Ok(())
    }

    pub async fn edit_user(&mut self, id: UserId) -> anyhow::Result<()> {
        println!("{}", self.theme.heading("Edit User"));
        let mut form = match self.users.find_by_id(id) {
            Some(user) => FormController::edit(&user),
            None => FormController::<User>::fetch(&self.api, id).await?,
        };
        if let Some(user) = run_form(&mut form, &self.api, Some(&self.users), &self.theme).await? {
            println!("{}", self.theme.success(&format!("Saved {} (#{})", user.username, user.id)));
        }
        Ok(())
    }

    pub async fn delete_user(&mut self, id: UserId) -> anyhow::Result<()> {
        if self.users.find_by_id(id).is_none() {
            self.users.refresh(&self.api).await?;
        }

        loop {
            self.user_gate.request(id);
            println!("{}", self.theme.heading("Confirm Deletion"));
            let question = format!("Are you sure you want to delete user #{}?", id);
            if !prompt::confirm(&question, &self.theme)? {
                self.user_gate.cancel();
                return Ok(());
            }

            let users = &self.users;
            let api = &self.api;
            let outcome = self
                .user_gate
                .confirm_with(|target| users.remove(api, target))
                .await;

            match outcome {
                Some(Ok(user)) => {
                    println!("{}", self.theme.success(&format!("Deleted {}", user.username)));
                    return Ok(());
                }
                Some(Err(StoreError::NotFound(_))) => {
                    println!("{}", self.theme.error.apply_to(format!("User #{} not found", id)));
                    return Ok(());
                }
                Some(Err(StoreError::Api(e))) if e.is_retryable() => {
                    println!("{}", self.theme.failure(&e));
                    if !prompt::confirm("Retry?", &self.theme)? {
                        return Ok(());
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            }
        }
    }

    pub async fn profile(&mut self, user_id: UserId) -> anyhow::Result<()> {
        match Resource::<Profile>::get(&self.api, user_id).await {
            Ok(profile) => {
                println!("{}", self.theme.heading("Profile"));
                for line in self.theme.profile_details(&profile) {
                    println!("{}", line);
                }
                let items = ["Edit profile", "Delete profile", "Back"];
                let picked = Select::with_theme(&self.theme.prompt)
                    .items(&items)
                    .default(2)
                    .interact()?;
                match picked {
                    0 => self.edit_profile(user_id).await,
                    1 => self.delete_profile(user_id).await,
                    _ => Ok(()),
                }
            }
            Err(ApiError::NotFound) => {
                println!("{}", self.theme.heading("Create Profile"));
                println!("{}", self.theme.muted.apply_to(format!("User #{} has no profile yet", user_id)));
                if prompt::confirm("Create one now?", &self.theme)? {
                    self.create_profile(user_id).await
                } else {
                    Ok(())
                }
            }
            Err(e) => {
                println!("{}", self.theme.failure(&e));
                Ok(())
            }
        }
    }

    pub async fn create_profile(&mut self, user_id: UserId) -> anyhow::Result<()> {
        if self.users.find_by_id(user_id).map_or(false, |u| u.has_profile()) {
            println!("{}", self.theme.error.apply_to("This user already has a profile"));
            return Ok(());
        }

        println!("{}", self.theme.heading("Create Profile"));
        let mut form = FormController::<Profile>::create_with(ProfileDraft::for_user(user_id));
        match run_form(&mut form, &self.api, None, &self.theme).await {
            Ok(Some(profile)) => {
                self.users
                    .patch(user_id, |u| u.profile = Some(profile.clone()));
                println!("{}", self.theme.success("Profile saved"));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                warn!("profile creation abandoned: {}", e);
                Err(e)
            }
        }
    }

    pub async fn edit_profile(&mut self, user_id: UserId) -> anyhow::Result<()> {
        println!("{}", self.theme.heading("Edit Profile"));
        let mut form = FormController::<Profile>::fetch(&self.api, user_id).await?;
        if let Some(profile) = run_form(&mut form, &self.api, None, &self.theme).await? {
            self.users
                .patch(user_id, |u| u.profile = Some(profile.clone()));
            println!("{}", self.theme.success("Profile saved"));
        }
        Ok(())
    }

    pub async fn delete_profile(&mut self, user_id: UserId) -> anyhow::Result<()> {
        self.profile_gate.request(user_id);
        println!("{}", self.theme.heading("Confirm Deletion"));
        if !prompt::confirm("Are you sure you want to delete this profile?", &self.theme)? {
            self.profile_gate.cancel();
            return Ok(());
        }

        let api = &self.api;
        let outcome = self
            .profile_gate
            .confirm_with(|target| Resource::<Profile>::delete(api, target))
            .await;

        let Some(outcome) = outcome else {
            return Ok(());
        };
        if matches!(outcome, Ok(()) | Err(ApiError::NotFound)) {
            self.users.patch(user_id, |u| u.profile = None);
        }
        println!("{}", self.theme.profile_removed(user_id, &outcome));
        Ok(())
    }
}
