//! Remote shopping carts.
//!
//! A [`Cart`] drives the five cart operations through its own [`Request`]
//! and mirrors the remote cart's identity and contents after every call.
//! Cart traffic never goes through the response cache.

use crate::config::Config;
use crate::ecs::node::{uncamelise, Node, NodeList};
use crate::ecs::operation::{
    batch_parameters, params, Operation, OperationKind, Params, ResponseGroup,
};
use crate::ecs::request::{PageCount, Request};
use crate::error::{EcsError, Result};
use tracing::info;

/// Lifecycle of the local cart handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartState {
    /// No remote cart is bound yet.
    Uninitialized,
    /// Bound to a remote cart by id and HMAC.
    Active,
}

/// One line of a cart, as last reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    node: Node,
}

impl CartItem {
    pub fn new(node: Node) -> Self {
        Self { node }
    }

    /// Service-assigned id of this cart line.
    pub fn cart_item_id(&self) -> Option<&str> {
        self.field("cart_item_id")
    }

    pub fn asin(&self) -> Option<&str> {
        self.field("asin")
    }

    pub fn quantity(&self) -> Option<u32> {
        self.field("quantity").and_then(|q| q.trim().parse().ok())
    }

    /// Text of any leaf field, by snake_case name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.node.get(name).and_then(NodeList::value)
    }

    pub fn node(&self) -> &Node {
        &self.node
    }
}

/// A remote shopping cart.
pub struct Cart {
    request: Request,
    state: CartState,
    cart_id: Option<String>,
    hmac: Option<String>,
    purchase_url: Option<String>,
    items: Vec<CartItem>,
    saved: Vec<CartItem>,
}

impl Cart {
    /// Wraps `request`, disabling its cache.
    pub fn new(mut request: Request) -> Self {
        request.set_cache(None);
        Self {
            request,
            state: CartState::Uninitialized,
            cart_id: None,
            hmac: None,
            purchase_url: None,
            items: Vec::new(),
            saved: Vec::new(),
        }
    }

    /// Creates a cart over HTTP from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let config = Config { cache: false, ..config.clone() };
        Ok(Self::new(Request::new(&config)?))
    }

    pub fn state(&self) -> CartState {
        self.state
    }

    pub fn cart_id(&self) -> Option<&str> {
        self.cart_id.as_deref()
    }

    pub fn hmac(&self) -> Option<&str> {
        self.hmac.as_deref()
    }

    /// URL at which the cart's contents can be bought.
    pub fn purchase_url(&self) -> Option<&str> {
        self.purchase_url.as_deref()
    }

    /// Items in the active area.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Items saved for later.
    pub fn saved_for_later_items(&self) -> &[CartItem] {
        &self.saved
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Creates a remote cart holding `item_id` and any `more` items.
    ///
    /// Replaces whatever cart this handle was bound to. With `merge`, the
    /// remote cart merges into the shopper's retail cart at checkout.
    pub async fn create(
        &mut self,
        id_type: &str,
        item_id: &str,
        quantity: u32,
        merge: bool,
        more: &[(&str, u32)],
    ) -> Result<()> {
        let items = with_first(item_id, quantity, more);
        let mut op = item_operation(OperationKind::CartCreate, id_type, &items, None);
        if merge {
            op.set_param("MergeCart", "True");
        }

        let cart = self.call(&op).await?;
        self.bind(&cart)?;
        self.items = area(&cart, "cart_items", "cart_item");
        self.saved = area(&cart, "saved_for_later_items", "saved_for_later_item");
        info!("Created cart {}", self.cart_id.as_deref().unwrap_or(""));
        Ok(())
    }

    /// Adds items to the active area.
    pub async fn add(
        &mut self,
        id_type: &str,
        item_id: &str,
        quantity: u32,
        more: &[(&str, u32)],
    ) -> Result<()> {
        self.require_active()?;
        let items = with_first(item_id, quantity, more);
        let op = self.identify(item_operation(OperationKind::CartAdd, id_type, &items, None));

        let cart = self.call(&op).await?;
        self.items = area(&cart, "cart_items", "cart_item");
        Ok(())
    }

    /// Changes quantities, or moves items between areas.
    ///
    /// Items are named by `id_type` (e.g. `ASIN`) and resolved to their cart
    /// line ids. `Some(true)` saves them for later and `Some(false)` moves
    /// them back to the active area, both leaving quantities alone; `None`
    /// sets the quantity, where 0 removes the line.
    pub async fn modify(
        &mut self,
        id_type: &str,
        item_id: &str,
        quantity: u32,
        save_for_later: Option<bool>,
        more: &[(&str, u32)],
    ) -> Result<()> {
        self.require_active()?;

        let mut lines = Vec::with_capacity(more.len() + 1);
        for (id, qty) in with_first(item_id, quantity, more) {
            let line = self.include(id_type, id).ok_or_else(|| {
                EcsError::Cart(format!("Can't find item with '{}' of '{}' in cart", id_type, id))
            })?;
            lines.push((line.to_string(), qty));
        }
        let lines: Vec<(&str, u32)> = lines.iter().map(|(id, q)| (id.as_str(), *q)).collect();
        let op = item_operation(OperationKind::CartModify, "CartItemId", &lines, save_for_later);
        let op = self.identify(op);

        let cart = self.call(&op).await?;
        self.items = area(&cart, "cart_items", "cart_item");
        self.saved = area(&cart, "saved_for_later_items", "saved_for_later_item");
        Ok(())
    }

    /// Binds this handle to an existing remote cart and loads its contents.
    pub async fn get(&mut self, cart_id: &str, hmac: &str) -> Result<()> {
        let ids = params([("CartId", cart_id), ("HMAC", hmac)]);
        let op = Operation::new(OperationKind::CartGet, ids);

        let cart = self.call(&op).await?;
        self.bind(&cart)?;
        self.items = area(&cart, "cart_items", "cart_item");
        self.saved = area(&cart, "saved_for_later_items", "saved_for_later_item");
        Ok(())
    }

    /// Empties both areas of the cart.
    pub async fn clear(&mut self) -> Result<()> {
        self.require_active()?;
        let op = self.identify(Operation::new(OperationKind::CartClear, Params::new()));

        self.call(&op).await?;
        self.items.clear();
        self.saved.clear();
        Ok(())
    }

    /// Line id of the item whose `id_type` field equals `value`, in either area.
    pub fn include(&self, id_type: &str, value: &str) -> Option<&str> {
        self.active(id_type, value).or_else(|| self.saved_for_later(id_type, value))
    }

    /// Line id of a matching item in the active area.
    pub fn active(&self, id_type: &str, value: &str) -> Option<&str> {
        find_line(&self.items, id_type, value)
    }

    /// Line id of a matching item in the saved-for-later area.
    pub fn saved_for_later(&self, id_type: &str, value: &str) -> Option<&str> {
        find_line(&self.saved, id_type, value)
    }

    fn require_active(&self) -> Result<()> {
        match self.state {
            CartState::Active => Ok(()),
            CartState::Uninitialized => Err(EcsError::Cart("cart has not been created".to_string())),
        }
    }

    /// Adds the cart's id and HMAC to `op`.
    fn identify(&self, mut op: Operation) -> Operation {
        op.set_param("CartId", self.cart_id.clone().unwrap_or_default());
        op.set_param("HMAC", self.hmac.clone().unwrap_or_default());
        op
    }

    /// Runs a cart operation and returns the `<Cart>` element of the reply.
    async fn call(&mut self, op: &Operation) -> Result<Node> {
        let group = ResponseGroup::new(["Cart"]);
        let result = self.request.search(op, &group, PageCount::Count(1)).await?;
        let response = result.into_pages().remove(0);

        let outer = format!("{}_response", uncamelise(op.kind().name()));
        response
            .path(&[outer.as_str(), "cart"])
            .and_then(NodeList::first)
            .cloned()
            .ok_or_else(|| EcsError::Cart(format!("{} reply has no cart", op.kind())))
    }

    fn bind(&mut self, cart: &Node) -> Result<()> {
        let text = |name: &str| cart.get(name).and_then(NodeList::value).map(str::to_string);

        let cart_id = text("cart_id").ok_or_else(|| EcsError::Cart("reply has no CartId".into()))?;
        let hmac = text("hmac").ok_or_else(|| EcsError::Cart("reply has no HMAC".into()))?;

        self.cart_id = Some(cart_id);
        self.hmac = Some(hmac);
        self.purchase_url = text("purchase_url");
        self.state = CartState::Active;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartItem;
    type IntoIter = std::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn with_first<'a>(item_id: &'a str, quantity: u32, more: &[(&'a str, u32)]) -> Vec<(&'a str, u32)> {
    let mut items = Vec::with_capacity(more.len() + 1);
    items.push((item_id, quantity));
    items.extend_from_slice(more);
    items
}

/// Builds a cart operation with items batched as `Item.N.*`.
pub fn item_operation(
    kind: OperationKind,
    id_type: &str,
    items: &[(&str, u32)],
    save_for_later: Option<bool>,
) -> Operation {
    let sets: Vec<Params> = items
        .iter()
        .map(|(id, quantity)| {
            let mut set = params([(id_type, *id)]);
            match save_for_later {
                Some(true) => set.insert("Action".to_string(), "SaveForLater".to_string()),
                Some(false) => set.insert("Action".to_string(), "MoveToCart".to_string()),
                None => set.insert("Quantity".to_string(), quantity.to_string()),
            };
            set
        })
        .collect();

    Operation::new(kind, batch_parameters(kind.batch_prefix(), &sets))
}

fn area(cart: &Node, container: &str, entry: &str) -> Vec<CartItem> {
    cart.path(&[container, entry])
        .map(|list| list.iter().cloned().map(CartItem::new).collect())
        .unwrap_or_default()
}

fn find_line<'a>(items: &'a [CartItem], id_type: &str, value: &str) -> Option<&'a str> {
    let field = uncamelise(id_type);
    items
        .iter()
        .find(|item| item.field(&field) == Some(value))
        .and_then(CartItem::cart_item_id)
}
