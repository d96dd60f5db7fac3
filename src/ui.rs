use crate::auth::AccountMode;
use crate::models::CategoryRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Warning,
    Success,
}

impl NoticeKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Success => "ok",
        }
    }
}

/// Inline message shown above a form.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }
}

/// The three dashboard destinations, in sidebar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Status,
    Tracker,
    Input,
}

impl View {
    pub const ALL: [View; 3] = [View::Status, View::Tracker, View::Input];

    pub fn path(self) -> &'static str {
        match self {
            Self::Status => "/status",
            Self::Tracker => "/tracker",
            Self::Input => "/input",
        }
    }

    pub fn nav_label(self) -> &'static str {
        match self {
            Self::Status => "Current Status & CO2 Contributor",
            Self::Tracker => "GHG Tracker",
            Self::Input => "Input for GHG Calc",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Self::Status => "Current Status & CO2 Contributor",
            Self::Tracker => "GHG Tracker",
            Self::Input => "Update GHG Calculation Data",
        }
    }
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// First letter upper case, the rest lower case.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Substitutes `{{KEY}}` slots in one pass over the template. Inserted
/// values are never scanned again, so text that looks like a slot stays
/// literal. Unknown slots are copied through unchanged.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        let key = &after[..end];
        match values.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn render_notice(notice: Option<&Notice>) -> String {
    match notice {
        Some(notice) => format!(
            r#"<div class="notice" data-type="{}">{}</div>"#,
            notice.kind.as_str(),
            escape_html(&notice.text)
        ),
        None => String::new(),
    }
}

pub fn render_account(mode: AccountMode, username: &str, notice: Option<&Notice>) -> String {
    let tabs = [
        (AccountMode::Login, "Login"),
        (AccountMode::SignUp, "Sign Up"),
        (AccountMode::Recover, "Forgot Password"),
    ]
    .iter()
    .map(|(tab, label)| {
        let class = if *tab == mode { "tab active" } else { "tab" };
        format!(r#"<a class="{class}" href="/?mode={}">{label}</a>"#, tab.slug())
    })
    .collect::<String>();

    let username = escape_html(username);
    let form = match mode {
        AccountMode::Login => format!(
            r#"<form method="post" action="/login">
        <label>Username<input name="username" value="{username}" autocomplete="username" /></label>
        <label>Password<input name="password" type="password" autocomplete="current-password" /></label>
        <button type="submit">Login</button>
      </form>"#
        ),
        AccountMode::SignUp => format!(
            r#"<form method="post" action="/signup">
        <label>New Username<input name="username" value="{username}" /></label>
        <label>New Password<input name="password" type="password" autocomplete="new-password" /></label>
        <label>Recovery Key<input name="recovery_key" placeholder="A secret word to recover your password" /></label>
        <button type="submit">Create Account</button>
      </form>"#
        ),
        AccountMode::Recover => format!(
            r#"<form method="post" action="/recover">
        <label>Username<input name="username" value="{username}" /></label>
        <label>Recovery Key<input name="recovery_key" /></label>
        <button type="submit">Recover Password</button>
      </form>"#
        ),
    };

    fill(
        ACCOUNT_HTML,
        &[
            ("STYLE", STYLE),
            ("TABS", &tabs),
            ("NOTICE", &render_notice(notice)),
            ("FORM", &form),
        ],
    )
}

fn render_dashboard(view: View, user: &str, body: &str) -> String {
    let nav = View::ALL
        .iter()
        .map(|item| {
            let class = if *item == view { "nav active" } else { "nav" };
            format!(
                r#"<a class="{class}" href="{}">{}</a>"#,
                item.path(),
                escape_html(item.nav_label())
            )
        })
        .collect::<String>();

    fill(
        DASHBOARD_HTML,
        &[
            ("STYLE", STYLE),
            ("TITLE", &escape_html(view.heading())),
            ("USER", &escape_html(&capitalize(user))),
            ("NAV", &nav),
            ("BODY", body),
        ],
    )
}

pub fn render_status(user: &str, chart: &str) -> String {
    let body = format!(
        r#"<section class="card"><h2>Carbon Contribution by Category</h2>{chart}</section>"#
    );
    render_dashboard(View::Status, user, &body)
}

pub fn render_tracker(user: &str, chart: &str) -> String {
    let body = format!(
        r#"<section class="card"><p class="subtitle">Distribution of Emissions</p>{chart}</section>"#
    );
    render_dashboard(View::Tracker, user, &body)
}

pub fn render_input(
    user: &str,
    records: &[CategoryRecord],
    selected: Option<&str>,
    notice: Option<&Notice>,
) -> String {
    let mut seen: Vec<&str> = Vec::new();
    let mut options = String::new();
    for record in records {
        if seen.contains(&record.category.as_str()) {
            continue;
        }
        seen.push(&record.category);
        let name = escape_html(&record.category);
        let flag = if selected == Some(record.category.as_str()) {
            " selected"
        } else {
            ""
        };
        options.push_str(&format!(r#"<option value="{name}"{flag}>{name}</option>"#));
    }

    let rows = records
        .iter()
        .map(|record| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&record.category),
                record.value,
                record.kind
            )
        })
        .collect::<String>();

    let body = format!(
        r#"{notice}<section class="card">
      <form method="post" action="/input" class="update">
        <label>Select Category to Update<select name="category">{options}</select></label>
        <label>New Value<input name="value" type="number" min="0" step="0.1" value="0.0" /></label>
        <button type="submit">Update Main Excel File</button>
      </form>
    </section>
    <section class="card">
      <table><thead><tr><th>Category</th><th>Value</th><th>Type</th></tr></thead><tbody>{rows}</tbody></table>
      <p class="hint"><a href="/export.xlsx">Download the workbook</a></p>
    </section>"#,
        notice = render_notice(notice)
    );
    render_dashboard(View::Input, user, &body)
}

pub fn render_unavailable(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\" /><title>GHG Tracker</title><style>{STYLE}</style></head><body><main class=\"app\"><h1>Data unavailable</h1><div class=\"notice\" data-type=\"error\">{}</div></main></body></html>",
        escape_html(message)
    )
}

const STYLE: &str = r#"
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #eef6ee;
      --bg-2: #cfe8d2;
      --ink: #1f2a22;
      --accent: #238b45;
      --accent-2: #00441b;
      --card: rgba(255, 255, 255, 0.9);
      --shadow: 0 24px 60px rgba(0, 68, 27, 0.14);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #f4faf3 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
    }

    h1, h2 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      margin: 0;
    }

    .app {
      width: min(520px, 100%);
      margin: 48px auto;
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 22px;
    }

    .shell {
      display: grid;
      grid-template-columns: 260px 1fr;
      min-height: 100vh;
    }

    aside {
      background: var(--accent-2);
      color: white;
      padding: 28px 20px;
      display: grid;
      align-content: start;
      gap: 10px;
    }

    aside h2 {
      font-size: 1.3rem;
      margin-bottom: 12px;
    }

    .nav {
      color: #dcefdc;
      text-decoration: none;
      padding: 10px 14px;
      border-radius: 12px;
    }

    .nav.active {
      background: rgba(255, 255, 255, 0.16);
      color: white;
      font-weight: 600;
    }

    .content {
      padding: 36px;
      display: grid;
      align-content: start;
      gap: 22px;
    }

    .card {
      background: white;
      border-radius: 20px;
      padding: 20px;
      border: 1px solid rgba(0, 68, 27, 0.08);
      box-shadow: var(--shadow);
    }

    .subtitle, .hint {
      margin: 0;
      color: #5f6b61;
    }

    .tabs {
      display: flex;
      gap: 6px;
      padding: 6px;
      background: rgba(0, 68, 27, 0.08);
      border-radius: 999px;
    }

    .tab {
      flex: 1;
      text-align: center;
      border-radius: 999px;
      padding: 8px 14px;
      font-weight: 600;
      color: #5f6b61;
      text-decoration: none;
    }

    .tab.active {
      background: white;
      color: var(--accent-2);
    }

    form {
      display: grid;
      gap: 14px;
    }

    label {
      display: grid;
      gap: 6px;
      font-size: 0.9rem;
      color: #4b564d;
    }

    input, select {
      font: inherit;
      padding: 10px 12px;
      border-radius: 12px;
      border: 1px solid rgba(0, 68, 27, 0.2);
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 14px 20px;
      font-size: 1rem;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: white;
    }

    aside button {
      background: rgba(255, 255, 255, 0.12);
      margin-top: 18px;
      width: 100%;
    }

    .notice {
      padding: 12px 16px;
      border-radius: 12px;
      background: #eef2ef;
    }

    .notice[data-type="error"] {
      background: #fbe4e1;
      color: #a8321f;
    }

    .notice[data-type="warning"] {
      background: #fff3d6;
      color: #8a5a00;
    }

    .notice[data-type="ok"] {
      background: #e1f3e4;
      color: #1f6b38;
    }

    .pie {
      width: min(420px, 100%);
      display: block;
      margin: 12px auto;
    }

    .chart-label {
      fill: #7a847b;
      font-size: 13px;
    }

    .legend {
      list-style: none;
      padding: 0;
      display: flex;
      flex-wrap: wrap;
      gap: 8px 18px;
      justify-content: center;
    }

    .swatch {
      display: inline-block;
      width: 12px;
      height: 12px;
      border-radius: 3px;
      margin-right: 6px;
    }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    th, td {
      text-align: left;
      padding: 8px;
      border-bottom: 1px solid rgba(0, 68, 27, 0.08);
    }

    @media (max-width: 760px) {
      .shell {
        grid-template-columns: 1fr;
      }
    }
"#;

const ACCOUNT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>GHG Management Portal</title>
  <style>{{STYLE}}</style>
</head>
<body>
  <main class="app">
    <header>
      <h1>GHG Management Portal</h1>
      <p class="subtitle">Sign in to review and update emission categories.</p>
    </header>
    <nav class="tabs">{{TABS}}</nav>
    {{NOTICE}}
    {{FORM}}
  </main>
</body>
</html>
"#;

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>GHG Tracker</title>
  <style>{{STYLE}}</style>
</head>
<body>
  <div class="shell">
    <aside>
      <h2>{{USER}}</h2>
      {{NAV}}
      <form method="post" action="/logout">
        <button type="submit">Logout</button>
      </form>
    </aside>
    <main class="content">
      <h1>{{TITLE}}</h1>
      {{BODY}}
    </main>
  </div>
</body>
</html>
"#;
