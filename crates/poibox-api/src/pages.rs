//! Server-rendered HTML. Every piece of user-supplied text goes through
//! `esc`/`attr` before it reaches the page.

use std::fmt::Write;

use axum::response::Html;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as esc};

use poibox_db::board::PostListing;
use poibox_db::models::{AdjustmentRow, ListenerRow, PostRow};

use crate::flash::{Flash, FlashKind};

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
    .notice{background:#e6f4ea;padding:.5rem}.error{background:#fce8e6;padding:.5rem}\
    table{border-collapse:collapse}td,th{padding:.25rem .75rem;border-bottom:1px solid #ddd}\
    .reply{margin-left:2rem;border-left:2px solid #ccc;padding-left:.5rem}\
    .post{margin:1rem 0}small{color:#666}";

fn layout(title: &str, flash: Option<&Flash>, body: &str) -> Html<String> {
    let mut out = String::with_capacity(body.len() + 512);
    let _ = write!(
        out,
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{} · poibox</title>\
         <style>{STYLE}</style></head><body><nav><a href=\"/\">poibox</a></nav>",
        esc(title)
    );
    if let Some(flash) = flash {
        let class = match flash.kind {
            FlashKind::Notice => "notice",
            FlashKind::Error => "error",
        };
        let _ = write!(out, "<p class=\"{class}\">{}</p>", esc(&flash.message));
    }
    out.push_str(body);
    out.push_str("</body></html>");
    Html(out)
}

fn signed(amount: i64) -> String {
    if amount > 0 {
        format!("+{amount}")
    } else {
        amount.to_string()
    }
}

fn adjustment_table(out: &mut String, rows: &[AdjustmentRow], with_listener: bool) {
    if rows.is_empty() {
        out.push_str("<p>No entries yet.</p>");
        return;
    }
    out.push_str("<table><tr><th>when</th>");
    if with_listener {
        out.push_str("<th>listener</th>");
    }
    out.push_str("<th>amount</th><th>reason</th></tr>");
    for row in rows {
        let _ = write!(out, "<tr><td>{}</td>", esc(&row.created_at));
        if with_listener {
            let _ = write!(out, "<td>{}</td>", esc(&row.listener));
        }
        let _ = write!(
            out,
            "<td>{}</td><td>{}</td></tr>",
            signed(row.amount),
            esc(&row.reason)
        );
    }
    out.push_str("</table>");
}

fn ranking_table(out: &mut String, rows: &[ListenerRow]) {
    if rows.is_empty() {
        out.push_str("<p>No listeners yet.</p>");
        return;
    }
    out.push_str("<table><tr><th>#</th><th>name</th><th>points</th><th>total</th></tr>");
    for (rank, row) in rows.iter().enumerate() {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            rank + 1,
            esc(&row.name),
            row.points,
            row.total_points
        );
    }
    out.push_str("</table>");
}

pub fn landing(flash: Option<&Flash>, signed_in_as: Option<&str>, q: &str, results: &[String]) -> Html<String> {
    let mut body = String::from("<h1>poibox</h1>");
    match signed_in_as {
        Some(handle) => {
            let _ = write!(
                body,
                "<p>Signed in as <b>{}</b> · <a href=\"/admin\">admin panel</a> · <a href=\"/logout\">sign out</a></p>",
                esc(handle)
            );
        }
        None => body.push_str(
            "<p><a href=\"/login\">Sign in</a> or <a href=\"/signup\">create a liver account</a>.</p>",
        ),
    }

    let _ = write!(
        body,
        "<form method=\"get\" action=\"/\"><input name=\"q\" value=\"{}\" placeholder=\"find a liver\">\
         <button>search</button></form>",
        attr(q)
    );
    if !q.trim().is_empty() {
        if results.is_empty() {
            body.push_str("<p>No livers found.</p>");
        } else {
            body.push_str("<ul>");
            for handle in results {
                let _ = write!(
                    body,
                    "<li>{h} · <a href=\"/{h}/welcome\">passbook</a> · <a href=\"/{h}/board\">board</a> · \
                     <a href=\"/{h}/members\">members</a></li>",
                    h = esc(handle)
                );
            }
            body.push_str("</ul>");
        }
    }
    layout("home", flash, &body)
}

pub fn account_form(flash: Option<&Flash>, action: &str) -> Html<String> {
    let (title, button, other) = match action {
        "/signup" => ("Create account", "create", "<a href=\"/login\">already have an account?</a>"),
        _ => ("Sign in", "sign in", "<a href=\"/signup\">need an account?</a>"),
    };
    let body = format!(
        "<h1>{title}</h1><form method=\"post\" action=\"{action}\">\
         <p><input name=\"handle\" placeholder=\"handle\" required></p>\
         <p><input name=\"password\" type=\"password\" placeholder=\"password\" required></p>\
         <p><button>{button}</button></p></form><p>{other}</p>"
    );
    layout(title, flash, &body)
}

pub fn admin(
    flash: Option<&Flash>,
    handle: &str,
    q: &str,
    listeners: &[ListenerRow],
    history: &[AdjustmentRow],
) -> Html<String> {
    let mut body = String::new();
    let _ = write!(
        body,
        "<h1>{h}'s ledger</h1><p>Share <a href=\"/{h}/welcome\">/{h}/welcome</a> with your listeners · \
         <a href=\"/{h}/board\">board</a> · <a href=\"/logout\">sign out</a></p>",
        h = esc(handle)
    );

    body.push_str(
        "<h2>Add listener</h2><form method=\"post\" action=\"/admin\">\
         <input type=\"hidden\" name=\"action\" value=\"create\">\
         <input name=\"name\" placeholder=\"name\" required> \
         <input name=\"points\" placeholder=\"starting points\" inputmode=\"numeric\"> \
         <button>add</button></form>",
    );
    body.push_str(
        "<h2>Adjust points</h2><form method=\"post\" action=\"/admin\">\
         <input type=\"hidden\" name=\"action\" value=\"adjust\">\
         <input name=\"name\" placeholder=\"name\" required> \
         <input name=\"points\" placeholder=\"+10 or -5\" required> \
         <input name=\"reason\" placeholder=\"reason\"> \
         <button>apply</button></form>",
    );

    let _ = write!(
        body,
        "<h2>Listeners</h2><form method=\"get\" action=\"/admin\">\
         <input name=\"q\" value=\"{}\" placeholder=\"search by name\"> <button>search</button></form>",
        attr(q)
    );
    ranking_table(&mut body, listeners);

    body.push_str("<h2>Recent adjustments</h2>");
    adjustment_table(&mut body, history, true);

    layout("admin", flash, &body)
}

pub fn welcome(
    flash: Option<&Flash>,
    liver: &str,
    listener: Option<&ListenerRow>,
    passbook: &[AdjustmentRow],
) -> Html<String> {
    let mut body = String::new();
    let _ = write!(body, "<h1>Welcome to {}'s poibox</h1>", esc(liver));

    match listener {
        Some(me) => {
            let _ = write!(
                body,
                "<p>Hi <b>{}</b>! You have <b>{}</b> points ({} earned in total).</p>\
                 <p><a href=\"/{l}/board\">board</a> · <a href=\"/{l}/members\">members</a></p>\
                 <h2>Passbook</h2>",
                esc(&me.name),
                me.points,
                me.total_points,
                l = esc(liver)
            );
            adjustment_table(&mut body, passbook, false);
        }
        None => {
            let _ = write!(
                body,
                "<form method=\"post\" action=\"/{}/welcome\">\
                 <p><input name=\"name\" placeholder=\"your name\" required> <button>enter</button></p></form>",
                esc(liver)
            );
        }
    }
    layout(liver, flash, &body)
}

fn post_html(out: &mut String, post: &PostRow, can_like: bool) {
    let _ = write!(
        out,
        "<p id=\"post-{id}\"><b>{}</b> <small>{} · #{id} · ♥ {}</small><br>{}</p>",
        esc(&post.author),
        esc(&post.created_at),
        post.like_count,
        esc(&post.body),
        id = post.id
    );
    if can_like {
        let _ = write!(
            out,
            "<form method=\"post\" action=\"/like/{}\"><button>♥ like</button></form>",
            post.id
        );
    }
}

pub fn board(flash: Option<&Flash>, liver: &str, listing: &PostListing, viewer: Option<&str>) -> Html<String> {
    let mut body = String::new();
    let _ = write!(body, "<h1>{}'s board</h1>", esc(liver));

    match viewer {
        Some(name) => {
            let _ = write!(
                body,
                "<p>Posting as <b>{}</b></p><form method=\"post\" action=\"/{l}/board\">\
                 <textarea name=\"message\" required></textarea><br><button>post</button></form>",
                esc(name),
                l = esc(liver)
            );
        }
        None => {
            let _ = write!(
                body,
                "<p><a href=\"/{}/welcome\">Enter your name</a> to post and like.</p>",
                esc(liver)
            );
        }
    }

    if listing.top_level.is_empty() {
        body.push_str("<p>No posts yet.</p>");
    }
    for post in &listing.top_level {
        body.push_str("<div class=\"post\">");
        post_html(&mut body, post, viewer.is_some_and(|v| v != post.author));
        for reply in listing.replies_to(post.id) {
            body.push_str("<div class=\"reply\">");
            post_html(&mut body, reply, viewer.is_some_and(|v| v != reply.author));
            body.push_str("</div>");
        }
        if viewer.is_some() {
            let _ = write!(
                body,
                "<form class=\"reply\" method=\"post\" action=\"/{}/board\">\
                 <input type=\"hidden\" name=\"parent_id\" value=\"{}\">\
                 <input name=\"message\" placeholder=\"reply\" required> <button>reply</button></form>",
                esc(liver),
                post.id
            );
        }
        body.push_str("</div>");
    }
    layout(liver, flash, &body)
}

pub fn members(flash: Option<&Flash>, liver: &str, listeners: &[ListenerRow]) -> Html<String> {
    let mut body = String::new();
    let _ = write!(body, "<h1>{}'s listeners</h1>", esc(liver));
    ranking_table(&mut body, listeners);
    layout(liver, flash, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_text_is_escaped() {
        let listing = PostListing::partition(vec![PostRow {
            id: 1,
            scope: "alice_liver".into(),
            author: "<b>bob</b>".into(),
            body: "<script>alert(1)</script>".into(),
            parent_id: None,
            like_count: 0,
            created_at: "2024-01-01 00:00:00".into(),
        }]);
        let Html(page) = board(None, "alice_liver", &listing, Some("carol"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("action=\"/like/1\""));
    }

    #[test]
    fn authors_get_no_like_button() {
        let listing = PostListing::partition(vec![PostRow {
            id: 7,
            scope: "alice_liver".into(),
            author: "bob".into(),
            body: "hi".into(),
            parent_id: None,
            like_count: 3,
            created_at: "2024-01-01 00:00:00".into(),
        }]);
        let Html(page) = board(None, "alice_liver", &listing, Some("bob"));
        assert!(!page.contains("/like/7"));
        assert!(page.contains("♥ 3"));
    }
}
