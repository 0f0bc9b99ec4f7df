//! Server-rendered pages.
//!
//! Every dynamic value goes through `html_escape` before it is placed in
//! the markup.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::models::case::Case;

const HEADER: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>GC Tracker</title>
<link href="/style.css" rel="stylesheet">
</head>
<body>
<span class="left-margin"></span>
<span class="content">
<h1>Welcome to GC Tracker!</h1>
"#;

const FOOTER: &str = r#"
</span>
<span class="right-margin"></span>
</body>
</html>
"#;

const ACCOUNT_LINKS: &str = r#"<div><span><a href="/signout">Sign out</a></span><span><a href="/changepwd">Change password</a></span></div>"#;

fn render_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", encode_text(e)))
        .collect();
    format!(r#"<div class="error"><ul>{items}</ul></div>"#)
}

#[must_use]
pub fn render_page(content: &str, errors: &[String]) -> String {
    let mut page = String::with_capacity(HEADER.len() + content.len() + FOOTER.len());
    page.push_str(HEADER);
    page.push_str(&render_errors(errors));
    page.push_str(content);
    page.push_str(FOOTER);
    page
}

/// A page with a single line of text and an optional link.
#[must_use]
pub fn message_page(message: &str, link: Option<(&str, &str)>) -> String {
    let link = link.map_or_else(String::new, |(href, label)| {
        format!(
            r#"<div><a href="{}">{}</a></div>"#,
            encode_double_quoted_attribute(href),
            encode_text(label)
        )
    });
    render_page(
        &format!(r#"<p class="notice">{}</p>{link}"#, encode_text(message)),
        &[],
    )
}

#[must_use]
pub fn signin_page(username: &str, errors: &[String]) -> String {
    render_page(
        &format!(
            r#"<h2>Sign In</h2>
<form method="post" action="/signin">
<div>Username <input type="text" name="username" value="{}"></div>
<div>Password <input type="password" name="password"></div>
<div>
<span><input type="submit" value="Sign in"></span>
<span><a href="/signup">Sign Up</a></span>
<span><a href="/resetpwd">Forgot password?</a></span>
</div>
</form>
"#,
            encode_double_quoted_attribute(username)
        ),
        errors,
    )
}

#[must_use]
pub fn signup_page(username: &str, email: &str, errors: &[String]) -> String {
    render_page(
        &format!(
            r#"<h2>Sign Up</h2>
<form method="post" action="/signup">
<div>Username <input type="text" name="username" value="{}"></div>
<div>E-Mail <input type="text" name="email" value="{}"></div>
<div>Password <input type="password" name="password"></div>
<div>Confirm password <input type="password" name="password2"></div>
<div>
<span><input type="submit" value="Sign Up"></span>
<span><a href="/signin">Sign In</a></span>
<span><a href="/resetpwd">Forgot password?</a></span>
</div>
</form>
"#,
            encode_double_quoted_attribute(username),
            encode_double_quoted_attribute(email)
        ),
        errors,
    )
}

#[must_use]
pub fn resetpwd_page(errors: &[String]) -> String {
    render_page(
        r#"<h2>Reset password</h2>
<form method="post" action="/resetpwd">
<div>Username <input type="text" name="username"></div>
<div>
<span><input type="submit" value="Reset password"></span>
<span><a href="/signin">Sign In</a></span>
<span><a href="/signup">Sign Up</a></span>
</div>
</form>
"#,
        errors,
    )
}

#[must_use]
pub fn changepwd_page(errors: &[String]) -> String {
    render_page(
        r#"<h2>Change password</h2>
<form method="post" action="/changepwd">
<div>Password <input type="password" name="password"></div>
<div>Confirm password <input type="password" name="password2"></div>
<div>
<span><input type="submit" value="Change password"></span>
</div>
</form>
"#,
        errors,
    )
}

fn render_case_row(case: &Case) -> String {
    let id = encode_double_quoted_attribute(&case.id);
    format!(
        r#"<tr><td class="check"><input type="checkbox" name="cases" value="{id}"></td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
        encode_text(&case.id),
        encode_text(&case.name),
        encode_text(&case.status),
    )
}

#[must_use]
pub fn cases_page(username: &str, cases: &[Case], errors: &[String]) -> String {
    let rows: String = cases.iter().map(render_case_row).collect();
    render_page(
        &format!(
            r#"<h2>Cases of {}</h2>
<form method="post" action="/case">
<table>
{rows}
</table>
<div>
<span>ID <input type="text" name="case"></span>
<span>Description <input type="text" name="name"></span>
</div>
<div>
<span><input type="submit" name="add" value="Add"></span>
<span><input type="submit" name="delete" value="Delete"></span>
</div>
</form>
{ACCOUNT_LINKS}"#,
            encode_text(username)
        ),
        errors,
    )
}
