//! Output formatting for responses and carts (text outline, JSON).

use crate::config::OutputFormat;
use crate::ecs::node::{uncamelise, Node};
use crate::ecs::{Cart, CartItem, SearchResult};
use crate::error::Result;
use serde_json::{json, Value};
use std::fmt::Write;

/// Formats results for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats every page of a search result.
    ///
    /// With `kernel`, only the records each page's kernel path leads to are
    /// shown; pages without a kernel fail.
    pub fn format_result(&self, result: &SearchResult, kernel: bool) -> Result<String> {
        let mut pages = Vec::with_capacity(result.len());
        for response in result.pages() {
            let nodes: Vec<&Node> = if kernel {
                response.kernel()?.iter().collect()
            } else {
                response.root().children().flat_map(|(_, list)| list.iter()).collect()
            };
            pages.push(nodes);
        }

        Ok(match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = pages
                    .iter()
                    .map(|nodes| Value::Array(nodes.iter().map(|n| n.to_value()).collect()))
                    .collect();
                let value = match values.len() {
                    1 => values.into_iter().next().unwrap_or(Value::Null),
                    _ => Value::Array(values),
                };
                pretty(&value)
            }
            OutputFormat::Text => {
                let mut out = String::new();
                for (index, nodes) in pages.iter().enumerate() {
                    if pages.len() > 1 {
                        let _ = writeln!(out, "--- page {} ---", index + 1);
                    }
                    if nodes.is_empty() {
                        out.push_str("No results.\n");
                    }
                    for node in nodes {
                        out.push_str(&outline(node));
                    }
                }
                out.trim_end().to_string()
            }
        })
    }

    /// Formats a cart's identity and both item areas.
    pub fn format_cart(&self, cart: &Cart) -> String {
        match self.format {
            OutputFormat::Json => {
                pretty(&json!({
                    "cart_id": cart.cart_id(),
                    "hmac": cart.hmac(),
                    "purchase_url": cart.purchase_url(),
                    "items": values(cart.items()),
                    "saved_for_later_items": values(cart.saved_for_later_items()),
                }))
            }
            OutputFormat::Text => {
                let mut lines = Vec::new();
                lines.push(format!("Cart ID:      {}", cart.cart_id().unwrap_or("N/A")));
                lines.push(format!("HMAC:         {}", cart.hmac().unwrap_or("N/A")));
                lines.push(format!("Purchase URL: {}", cart.purchase_url().unwrap_or("N/A")));
                lines.push(String::new());
                lines.push(format!("Items ({}):", cart.items().len()));
                lines.extend(cart.items().iter().map(item_line));
                lines.push(format!("Saved for later ({}):", cart.saved_for_later_items().len()));
                lines.extend(cart.saved_for_later_items().iter().map(item_line));
                lines.join("\n")
            }
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

fn values(items: &[CartItem]) -> Vec<Value> {
    items.iter().map(|item| item.node().to_value()).collect()
}

fn item_line(item: &CartItem) -> String {
    format!(
        "  {:<16} {:<12} x{:<4} {}",
        item.cart_item_id().unwrap_or("-"),
        item.asin().unwrap_or("-"),
        item.quantity().unwrap_or(0),
        item.field("title").unwrap_or("")
    )
}

/// Renders `node` and its descendants as an indented outline.
///
/// Leaves print as `name: value`; attributes follow their element's name in
/// brackets.
pub fn outline(node: &Node) -> String {
    let mut out = String::new();
    write_outline(&mut out, &uncamelise(node.tag()), node, 0);
    out
}

fn write_outline(out: &mut String, name: &str, node: &Node, depth: usize) {
    let indent = "  ".repeat(depth);
    let attrib = if node.attrib().is_empty() {
        String::new()
    } else {
        let pairs: Vec<String> = node.attrib().iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!(" [{}]", pairs.join(", "))
    };

    match node.value() {
        Some(value) if node.is_leaf() => {
            let _ = writeln!(out, "{}{}{}: {}", indent, name, attrib, value);
        }
        _ => {
            let _ = writeln!(out, "{}{}{}", indent, name, attrib);
            for (field, list) in node.children() {
                for child in list {
                    write_outline(out, field, child, depth + 1);
                }
            }
        }
    }
}
