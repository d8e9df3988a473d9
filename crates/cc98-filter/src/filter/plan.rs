//! The pure re-scan: document plus block set in, commands out.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use tracing::{debug, trace};

use super::{
    Action, Command, FieldSurface, FragmentKey, Redaction, ScanContext, ScanPlan, Surface,
    WindowSurface,
};
use crate::config::LabelConfig;
use crate::dom::{Document, Markup, NodeId, Selector};
use crate::entity::EntityKind;

const MUTED_COLOR: &str = "#999";
const AVATAR_FILTER: &str = "grayscale(100%) opacity(50%)";
const DISABLED_HREF: &str = "javascript:void(0)";
const BODY_PANEL_STYLE: &str = "color: #999; font-style: italic; padding: 20px; \
    text-align: center; border: 1px dashed #ddd; border-radius: 4px; margin: 10px 0;";
const WINDOW_PANEL_STYLE: &str = "text-align: center; padding: 50px; color: #999; font-size: 1.2em;";
const WINDOW_ICON_STYLE: &str = "width: 400px; height: 400px; border-radius: 50%; \
    filter: grayscale(100%) opacity(50%); margin-bottom: 20px;";

/// Decide every mutation a full scan of `doc` would make.
///
/// Surfaces are visited in table order (hot list, topics, replies, message
/// contacts) and the conversation window last. Message surfaces are only
/// visited on message pages. Each fragment not yet processed gets a board
/// check first; a blocked board hides the whole fragment and nothing else is
/// looked at. Otherwise a blocked username redacts the fragment field by
/// field. Fields whose selectors find nothing are left alone.
#[must_use]
pub fn plan(doc: &Document, ctx: &ScanContext<'_>) -> ScanPlan {
    let mut out = ScanPlan::default();
    let on_message_page = ctx.settings.is_message_page(doc.url());

    for field in ctx.settings.surfaces.fields() {
        if field.surface.is_message_page_only() && !on_message_page {
            continue;
        }
        for fragment in field.fragments(doc) {
            if ctx.is_processed(doc, fragment) {
                out.skipped += 1;
                continue;
            }
            plan_fragment(doc, ctx, field, fragment, &mut out);
        }
    }

    // Windows are re-read on every scan. The page reuses the same element
    // for each conversation, and a withheld window has no title left to read.
    if on_message_page {
        let window = ctx.settings.surfaces.window();
        for fragment in window.fragments(doc) {
            plan_window(doc, ctx, window, fragment, &mut out);
        }
    }

    out
}

fn plan_fragment(
    doc: &Document,
    ctx: &ScanContext<'_>,
    field: &FieldSurface,
    fragment: NodeId,
    out: &mut ScanPlan,
) {
    if let Some(board) = read_text(doc, fragment, &field.board) {
        let board = unwrap_brackets(&board);
        if ctx.blocks.is_board_blocked(board) {
            debug!(surface = %field.surface, %board, "Hiding fragment of blocked board");
            let key = FragmentKey::new(field.surface, board, fragment);
            out.commands.push(Command::Hide { target: fragment });
            out.commands.push(Command::Mark {
                target: fragment,
                marker: ctx.settings.markers.board_blocked.clone(),
                value: "true".to_string(),
            });
            out.redactions.push(Redaction {
                key,
                surface: field.surface,
                node: fragment,
                owner_kind: EntityKind::Board,
                owner: board.to_string(),
                action: Action::Hidden,
            });
            return;
        }
    }

    let Some(username) = read_text(doc, fragment, &field.username) else {
        trace!(surface = %field.surface, %fragment, "No username on fragment");
        return;
    };
    if !ctx.blocks.is_user_blocked(&username) {
        return;
    }

    debug!(surface = %field.surface, user = %username, "Redacting fragment of blocked user");
    redact_user(doc, ctx, field, fragment, &username, out);
}

fn redact_user(
    doc: &Document,
    ctx: &ScanContext<'_>,
    field: &FieldSurface,
    fragment: NodeId,
    username: &str,
    out: &mut ScanPlan,
) {
    let settings = ctx.settings;
    let labels = &settings.labels;
    let label = ctx.blocks.label_for(username, &labels.default_content);
    let commands = &mut out.commands;

    if let Some(name) = doc.select_fallback(fragment, &field.username) {
        commands.push(Command::ReplaceChildren {
            target: name,
            markup: vec![Markup::element("span")
                .style(format!("color: {MUTED_COLOR};"))
                .child(Markup::text(&labels.blocked_user))],
        });
    }

    if let Some(avatar) = doc.select_fallback(fragment, &field.avatar) {
        commands.push(Command::set_attr(avatar, "src", &settings.icon_url));
        commands.push(Command::set_style(avatar, "filter", AVATAR_FILTER));
        commands.push(Command::set_style(avatar, "border-radius", "50%"));
    }

    if let Some(title) = doc.select_fallback(fragment, &field.title) {
        commands.push(Command::SetText {
            target: title,
            text: label.to_string(),
        });
        commands.push(Command::set_style(title, "color", MUTED_COLOR));
        commands.push(Command::set_style(title, "font-style", "italic"));
        commands.push(Command::set_attr(title, "href", DISABLED_HREF));
    }

    if let Some(body) = doc.select_fallback(fragment, &field.body) {
        commands.push(Command::ReplaceChildren {
            target: body,
            markup: vec![body_panel(label, labels, ctx.now)],
        });
    }

    if let Some(info) = doc.select_fallback(fragment, &field.info) {
        commands.push(Command::ReplaceChildren {
            target: info,
            markup: vec![Markup::element("div")
                .style(format!("color: {MUTED_COLOR};"))
                .child(Markup::text(&labels.info_placeholder))],
        });
    }

    for media in select_all(doc, fragment, &field.media) {
        commands.push(Command::ClearChildren { target: media });
    }

    if let Some(preview) = doc.select_fallback(fragment, &field.preview) {
        commands.push(Command::ClearChildren { target: preview });
    }

    for chrome in select_all(doc, fragment, &field.chrome) {
        commands.push(Command::Remove { target: chrome });
    }

    let key = FragmentKey::new(field.surface, username, fragment);
    commands.push(Command::Mark {
        target: fragment,
        marker: settings.markers.redacted.clone(),
        value: key.short(),
    });
    out.redactions.push(Redaction {
        key,
        surface: field.surface,
        node: fragment,
        owner_kind: EntityKind::User,
        owner: username.to_string(),
        action: Action::Redacted,
    });
}

fn plan_window(
    doc: &Document,
    ctx: &ScanContext<'_>,
    window: &WindowSurface,
    fragment: NodeId,
    out: &mut ScanPlan,
) {
    let Some(title) = read_text(doc, fragment, &window.title) else {
        return;
    };
    let Some(username) = window.correspondent(&title) else {
        debug!(%title, "Cannot read correspondent from window title");
        return;
    };
    if !ctx.blocks.is_user_blocked(username) {
        return;
    }

    debug!(user = %username, "Withholding message window");
    let settings = ctx.settings;
    let key = FragmentKey::new(Surface::MessageWindow, username, fragment);
    out.commands.push(Command::ReplaceChildren {
        target: fragment,
        markup: vec![withheld_panel(&settings.icon_url, &settings.labels)],
    });
    out.redactions.push(Redaction {
        key,
        surface: Surface::MessageWindow,
        node: fragment,
        owner_kind: EntityKind::User,
        owner: username.to_string(),
        action: Action::Withheld,
    });
}

/// Trimmed text of the first fallback match, if non-empty.
fn read_text(doc: &Document, scope: NodeId, chain: &[Selector]) -> Option<String> {
    let node = doc.select_fallback(scope, chain)?;
    let text = doc.text_content(node);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Every match of every selector, each node once.
fn select_all(doc: &Document, scope: NodeId, selectors: &[Selector]) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    for selector in selectors {
        for node in doc.select(scope, selector) {
            if !nodes.contains(&node) {
                nodes.push(node);
            }
        }
    }
    nodes
}

/// Hot list rows render the board as `[Board]`.
fn unwrap_brackets(board: &str) -> &str {
    board
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(board)
}

fn body_panel(label: &str, labels: &LabelConfig, now: DateTime<Utc>) -> Markup {
    Markup::element("div")
        .style(BODY_PANEL_STYLE)
        .child(Markup::text(label))
        .child(Markup::element("br"))
        .child(Markup::element("small").child(Markup::text(format!(
            "{}: {}",
            labels.blocked_time_prefix,
            format_time(now, &labels.time_format)
        ))))
}

fn withheld_panel(icon_url: &str, labels: &LabelConfig) -> Markup {
    let panel = Markup::element("div").style(WINDOW_PANEL_STYLE).child(
        Markup::element("img")
            .attr("src", icon_url)
            .style(WINDOW_ICON_STYLE),
    );
    let panel = labels.window_lines.iter().fold(panel, |panel, line| {
        panel.child(Markup::element("p").child(Markup::text(line)))
    });
    Markup::element("div")
        .attr("class", "cc98-blocked-message-window")
        .child(panel)
}

fn format_time(now: DateTime<Utc>, format: &str) -> String {
    let local = now.with_timezone(&Local);
    let mut out = String::new();
    if write!(out, "{}", local.format(format)).is_err() {
        return local.to_rfc3339();
    }
    out
}
