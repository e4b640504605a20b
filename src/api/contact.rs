//! Contact form

use axum::{
    Form, Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use super::flash::{Flash, FlashKind, encoded_redirect};
use super::pages::{attr, escape, layout};
use crate::AppState;
use crate::auth::MaybeUser;
use crate::data::NewContactSubmission;
use crate::metrics::CONTACT_SUBMISSIONS_TOTAL;
use crate::validation;

const SUBMITTED: &str = "Thank you for your message. We'll get back to you soon.";
const SUBMIT_FAILED: &str = "Failed to submit the form. Please try again.";

pub fn contact_router() -> Router<AppState> {
    Router::new().route("/contact", get(contact_page).post(submit_contact))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContactForm {
    name: String,
    email: String,
    subject: String,
    message: String,
}

fn contact_form(user: MaybeUser, flash: &Flash, form: &ContactForm) -> Html<String> {
    let body = format!(
        r#"<h1>Contact us</h1>
<p>Questions about an article or your account? Send us a message.</p>
<form method="post" action="/contact">
<label>Name <input type="text" name="name" value="{}" required></label>
<label>Email <input type="email" name="email" value="{}" required></label>
<label>Subject <input type="text" name="subject" value="{}" required></label>
<label>Message<br><textarea name="message" rows="6" cols="60" required minlength="10">{}</textarea></label>
<p><button type="submit">Send message</button></p>
</form>"#,
        attr(&form.name),
        attr(&form.email),
        attr(&form.subject),
        escape(&form.message),
    );
    layout("Contact", user.0.as_ref(), flash, &body)
}

/// GET /contact
async fn contact_page(user: MaybeUser, Query(flash): Query<Flash>) -> Html<String> {
    contact_form(user, &flash, &ContactForm::default())
}

/// POST /contact
///
/// Invalid input re-renders the form with what was typed; a stored
/// submission redirects back with a confirmation.
async fn submit_contact(
    State(state): State<AppState>,
    user: MaybeUser,
    Form(form): Form<ContactForm>,
) -> Response {
    if let Err(errors) =
        validation::validate_contact(&form.name, &form.email, &form.subject, &form.message)
    {
        let flash = Flash::error(errors.to_string());
        return contact_form(user, &flash, &form).into_response();
    }

    let submission = NewContactSubmission::new(
        form.name.trim().to_string(),
        form.email.trim().to_string(),
        form.subject.trim().to_string(),
        form.message.trim().to_string(),
    );

    match state.contacts.insert_contact(&submission).await {
        Ok(()) => {
            CONTACT_SUBMISSIONS_TOTAL.inc();
            tracing::info!(subject = %submission.subject, "Contact submission stored");
            encoded_redirect(FlashKind::Success, "/contact", SUBMITTED).into_response()
        }
        Err(error) => {
            tracing::error!(error = %error, "Failed to store contact submission");
            let flash = Flash::error(SUBMIT_FAILED);
            contact_form(user, &flash, &form).into_response()
        }
    }
}
