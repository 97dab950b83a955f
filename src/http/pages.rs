use crate::models::{Category, ItemId, ItemRecord};
use crate::session::SessionUser;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt::Write as _;

const PATH_SEGMENT_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}');

pub fn encode_segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT_SET).to_string()
}

pub fn category_url(category: &str) -> String {
    format!("/catalog/{}/", encode_segment(category))
}

pub fn item_url(category: &str, item_name: &str, item_id: ItemId) -> String {
    format!(
        "/catalog/{}/{}/{}/",
        encode_segment(category),
        encode_segment(item_name),
        item_id
    )
}

pub fn edit_url(item_name: &str, item_id: ItemId) -> String {
    format!("/catalog/{}/{}/edit/", encode_segment(item_name), item_id)
}

pub fn delete_url(item_name: &str, item_id: ItemId) -> String {
    format!("/catalog/{}/{}/delete/", encode_segment(item_name), item_id)
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Values pre-filled into the create/edit form.
#[derive(Debug, Clone, Default)]
pub struct ItemFormValues {
    pub name: String,
    pub description: String,
    pub category: String,
}

pub fn layout(title: &str, viewer: Option<&SessionUser>, flashes: &[String], body: &str) -> String {
    let account = match viewer {
        Some(user) => format!(
            "<span class=\"user\">{}</span> <a href=\"/gdisconnect\">Logout</a>",
            escape_html(&user.name)
        ),
        None => "<a href=\"/login/\">Login</a>".to_string(),
    };
    let mut flash_html = String::new();
    if !flashes.is_empty() {
        flash_html.push_str("<ul class=\"flashes\">");
        for message in flashes {
            let _ = write!(flash_html, "<li>{}</li>", escape_html(message));
        }
        flash_html.push_str("</ul>");
    }
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><header><a href=\"/catalog/\">Catalog App</a> {account}</header>{flash_html}<main>{body}</main></body></html>",
        title = escape_html(title),
    )
}

fn category_nav(categories: &[Category]) -> String {
    let mut html = String::from("<nav><h2>Categories</h2><ul>");
    for category in categories {
        let _ = write!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            escape_html(&category_url(&category.name)),
            escape_html(&category.name)
        );
    }
    html.push_str("</ul></nav>");
    html
}

pub fn catalog_page(
    categories: &[Category],
    latest: &[ItemRecord],
    viewer: Option<&SessionUser>,
    flashes: &[String],
) -> String {
    let mut body = category_nav(categories);
    if viewer.is_some() {
        body.push_str("<p><a href=\"/catalog/create/\">Add Item</a></p>");
    }
    body.push_str("<section><h2>Latest Items</h2><ul>");
    for record in latest {
        let _ = write!(
            body,
            "<li><a href=\"{}\">{}</a> <em>({})</em></li>",
            escape_html(&item_url(&record.category_name, &record.item.name, record.item.id)),
            escape_html(&record.item.name),
            escape_html(&record.category_name)
        );
    }
    body.push_str("</ul></section>");
    layout("Catalog", viewer, flashes, &body)
}

pub fn category_page(
    category: &Category,
    items: &[ItemRecord],
    categories: &[Category],
    viewer: Option<&SessionUser>,
    flashes: &[String],
) -> String {
    let mut body = category_nav(categories);
    let _ = write!(
        body,
        "<section><h2>{} Items ({} items)</h2><ul>",
        escape_html(&category.name),
        items.len()
    );
    for record in items {
        let _ = write!(
            body,
            "<li><a href=\"{}\">{}</a></li>",
            escape_html(&item_url(&record.category_name, &record.item.name, record.item.id)),
            escape_html(&record.item.name)
        );
    }
    body.push_str("</ul></section>");
    layout(&category.name, viewer, flashes, &body)
}

pub fn item_page(
    record: &ItemRecord,
    usercreated: bool,
    viewer: Option<&SessionUser>,
    flashes: &[String],
) -> String {
    let mut body = format!(
        "<article><h2>{}</h2><p class=\"category\">{}</p><p>{}</p>",
        escape_html(&record.item.name),
        escape_html(&record.category_name),
        escape_html(&record.item.description)
    );
    if usercreated {
        let _ = write!(
            body,
            "<p class=\"owner-actions\"><a href=\"{}\">Edit</a> | <a href=\"{}\">Delete</a></p>",
            escape_html(&edit_url(&record.item.name, record.item.id)),
            escape_html(&delete_url(&record.item.name, record.item.id))
        );
    }
    body.push_str("</article>");
    layout(&record.item.name, viewer, flashes, &body)
}

pub fn item_form(
    title: &str,
    action: &str,
    values: &ItemFormValues,
    categories: &[Category],
    viewer: Option<&SessionUser>,
    flashes: &[String],
) -> String {
    let mut options = String::new();
    for category in categories {
        let _ = write!(options, "<option value=\"{}\">", escape_html(&category.name));
    }
    let body = format!(
        "<h2>{title}</h2><form method=\"post\" action=\"{action}\">\
         <label>Name <input name=\"name\" maxlength=\"80\" value=\"{name}\"></label>\
         <label>Description <textarea name=\"description\" maxlength=\"250\">{description}</textarea></label>\
         <label>Category <input name=\"category\" list=\"categories\" maxlength=\"80\" value=\"{category}\"></label>\
         <datalist id=\"categories\">{options}</datalist>\
         <button type=\"submit\">Save</button></form>",
        title = escape_html(title),
        action = escape_html(action),
        name = escape_html(&values.name),
        description = escape_html(&values.description),
        category = escape_html(&values.category),
    );
    layout(title, viewer, flashes, &body)
}

pub fn delete_page(record: &ItemRecord, viewer: Option<&SessionUser>, flashes: &[String]) -> String {
    let body = format!(
        "<h2>Delete {name}?</h2><form method=\"post\" action=\"{action}\">\
         <button type=\"submit\">Delete</button> <a href=\"{cancel}\">Cancel</a></form>",
        name = escape_html(&record.item.name),
        action = escape_html(&delete_url(&record.item.name, record.item.id)),
        cancel = escape_html(&item_url(&record.category_name, &record.item.name, record.item.id)),
    );
    layout("Delete Item", viewer, flashes, &body)
}

pub fn login_page(client_id: Option<&str>, state_token: &str, viewer: Option<&SessionUser>) -> String {
    let body = match (viewer, client_id) {
        (Some(user), _) => format!("<p>You are logged in as {}.</p>", escape_html(&user.name)),
        (None, None) => "<p>Sign-in is not configured on this server.</p>".to_string(),
        (None, Some(client_id)) => format!(
            "<h2>Login</h2><div id=\"signinButton\" data-clientid=\"{client_id}\" data-state=\"{state}\" \
             data-connect=\"/gconnect?state={state}\" data-scope=\"openid email profile\"></div>\
             <script src=\"https://accounts.google.com/gsi/client\" async defer></script>",
            client_id = escape_html(client_id),
            state = escape_html(state_token),
        ),
    };
    layout("Login", viewer, &[], &body)
}

pub fn message_page(title: &str, message: &str, viewer: Option<&SessionUser>) -> String {
    let body = format!("<h2>{}</h2><p>{}</p>", escape_html(title), escape_html(message));
    layout(title, viewer, &[], &body)
}
