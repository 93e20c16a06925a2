use crate::theme::{label, Theme};
use dialoguer::{Confirm, Input, Select};
use userdir_lib::{Draft, Entity, FormController, Gender, ListStore, Profile, Resource, Submission};

const CUSTOM_GENDER: &str = "Describe it myself";

/// Prompts for `fields`, prefilled from the current draft.
///
/// Values are checked inline against the draft's rules before they are
/// accepted into the form.
pub fn fill<E: Entity>(
    form: &mut FormController<E>,
    fields: &[&'static str],
    theme: &Theme,
) -> anyhow::Result<()> {
    for &field in fields {
        let current = form.value(field).unwrap_or_default().to_string();
        let value = if field == "gender" {
            gender(&current, theme)?
        } else {
            text::<E>(field, &current, theme)?
        };
        form.set(field, value)?;
    }
    Ok(())
}

fn text<E: Entity>(field: &'static str, current: &str, theme: &Theme) -> anyhow::Result<String> {
    let value = Input::<String>::with_theme(&theme.prompt)
        .with_prompt(label(field))
        .with_initial_text(current)
        .allow_empty(true)
        .validate_with(|input: &String| FormController::<E>::check_field(field, input))
        .interact_text()?;
    Ok(value)
}

fn gender(current: &str, theme: &Theme) -> anyhow::Result<String> {
    let mut items: Vec<&str> = Gender::CHOICES.to_vec();
    items.push(CUSTOM_GENDER);

    let default = match items.iter().position(|g| *g == current) {
        Some(idx) => idx,
        None if current.is_empty() => 0,
        None => items.len() - 1,
    };

    let picked = Select::with_theme(&theme.prompt)
        .with_prompt("Gender")
        .items(&items)
        .default(default)
        .interact()?;

    if items[picked] != CUSTOM_GENDER {
        return Ok(items[picked].to_string());
    }

    let initial = if Gender::CHOICES.contains(&current) { "" } else { current };
    let value = Input::<String>::with_theme(&theme.prompt)
        .with_prompt("Gender")
        .with_initial_text(initial)
        .validate_with(|input: &String| FormController::<Profile>::check_field("gender", input))
        .interact_text()?;
    Ok(value)
}

pub fn confirm(prompt: &str, theme: &Theme) -> anyhow::Result<bool> {
    Ok(Confirm::with_theme(&theme.prompt)
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Drives a form until it commits or the user gives up.
///
/// Rejected fields are asked again. A failed request is shown with the
/// option to resend the unchanged draft.
pub async fn run_form<E, R>(
    form: &mut FormController<E>,
    api: &R,
    store: Option<&ListStore<E>>,
    theme: &Theme,
) -> anyhow::Result<Option<E>>
where
    E: Entity,
    R: Resource<E>,
{
    let mut pending: Vec<&'static str> = E::Draft::fields().to_vec();

    loop {
        fill(form, &pending, theme)?;

        let submission = match store {
            Some(store) => form.submit_into(api, store).await?,
            None => form.submit(api).await,
        };

        match submission {
            Submission::Committed(entity) => return Ok(Some(entity)),
            Submission::Invalid(errors) => {
                for line in theme.field_errors(&errors) {
                    println!("{}", line);
                }
                pending = rejected::<E>(form);
            }
            Submission::Failed(err) => {
                println!("{}", theme.failure(&err));
                for line in theme.field_errors(form.errors()) {
                    println!("{}", line);
                }
                pending = rejected::<E>(form);
                if pending.is_empty() && !confirm("Retry?", theme)? {
                    return Ok(None);
                }
            }
        }
    }
}

fn rejected<E: Entity>(form: &FormController<E>) -> Vec<&'static str> {
    E::Draft::fields()
        .iter()
        .copied()
        .filter(|f| form.error(f).is_some())
        .collect()
}
