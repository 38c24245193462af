//! Typed operations and response groups.
//!
//! An [`Operation`] is a kind plus a flat parameter map. Batched operations
//! encode several parameter sets as `Prefix.N.Param` keys, and two
//! operations can be combined into one request with [`Operation::combine`].

use crate::error::{EcsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Flat operation parameters. Ordered so that debugging output is stable.
pub type Params = BTreeMap<String, String>;

/// Builds a [`Params`] map from any key/value pairs.
pub fn params<I, K, V>(items: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    items.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Search indices accepted by `ItemSearch`. Not every index exists in every
/// locale; the service rejects the ones that don't.
pub const SEARCH_INDICES: &[&str] = &[
    "All",
    "Apparel",
    "Automotive",
    "Baby",
    "Beauty",
    "Blended",
    "Books",
    "Classical",
    "DigitalMusic",
    "DVD",
    "Electronics",
    "ForeignBooks",
    "GourmetFood",
    "HealthPersonalCare",
    "Hobbies",
    "HomeGarden",
    "Jewelry",
    "Kitchen",
    "Magazines",
    "Merchants",
    "Miscellaneous",
    "Music",
    "MusicalInstruments",
    "MusicTracks",
    "OfficeProducts",
    "OutdoorLiving",
    "PCHardware",
    "PetSupplies",
    "Photo",
    "Software",
    "SoftwareVideoGames",
    "SportingGoods",
    "Tools",
    "Toys",
    "VHS",
    "Video",
    "VideoGames",
    "Wireless",
    "WirelessAccessories",
];

/// Parameters accepted by `ItemSearch`.
pub const SEARCH_PARAMETERS: &[&str] = &[
    "Actor",
    "Artist",
    "AudienceRating",
    "Author",
    "Brand",
    "BrowseNode",
    "City",
    "Composer",
    "Conductor",
    "Director",
    "Keywords",
    "Manufacturer",
    "MusicLabel",
    "Neighborhood",
    "Orchestra",
    "Power",
    "Publisher",
    "TextStream",
    "Title",
    // optional refinements
    "Availability",
    "Condition",
    "MaximumPrice",
    "MerchantId",
    "MinimumPrice",
    "OfferStatus",
    "Sort",
];

/// Page parameter and highest reachable page for a kind of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub parameter: &'static str,
    pub max_page: u32,
}

/// Used for kinds without their own pagination entry.
pub const DEFAULT_PAGINATION: Pagination = Pagination { parameter: "ItemPage", max_page: 400 };

/// Operation kinds understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    BrowseNodeLookup,
    CustomerContentLookup,
    CustomerContentSearch,
    Help,
    ItemLookup,
    ItemSearch,
    ListLookup,
    ListSearch,
    SellerListingLookup,
    SellerListingSearch,
    SellerLookup,
    SimilarityLookup,
    TagLookup,
    TransactionLookup,
    CartAdd,
    CartClear,
    CartCreate,
    CartGet,
    CartModify,
}

impl OperationKind {
    /// Wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::BrowseNodeLookup => "BrowseNodeLookup",
            OperationKind::CustomerContentLookup => "CustomerContentLookup",
            OperationKind::CustomerContentSearch => "CustomerContentSearch",
            OperationKind::Help => "Help",
            OperationKind::ItemLookup => "ItemLookup",
            OperationKind::ItemSearch => "ItemSearch",
            OperationKind::ListLookup => "ListLookup",
            OperationKind::ListSearch => "ListSearch",
            OperationKind::SellerListingLookup => "SellerListingLookup",
            OperationKind::SellerListingSearch => "SellerListingSearch",
            OperationKind::SellerLookup => "SellerLookup",
            OperationKind::SimilarityLookup => "SimilarityLookup",
            OperationKind::TagLookup => "TagLookup",
            OperationKind::TransactionLookup => "TransactionLookup",
            OperationKind::CartAdd => "CartAdd",
            OperationKind::CartClear => "CartClear",
            OperationKind::CartCreate => "CartCreate",
            OperationKind::CartGet => "CartGet",
            OperationKind::CartModify => "CartModify",
        }
    }

    /// Returns all operation kinds.
    pub fn all() -> &'static [OperationKind] {
        &[
            OperationKind::BrowseNodeLookup,
            OperationKind::CustomerContentLookup,
            OperationKind::CustomerContentSearch,
            OperationKind::Help,
            OperationKind::ItemLookup,
            OperationKind::ItemSearch,
            OperationKind::ListLookup,
            OperationKind::ListSearch,
            OperationKind::SellerListingLookup,
            OperationKind::SellerListingSearch,
            OperationKind::SellerLookup,
            OperationKind::SimilarityLookup,
            OperationKind::TagLookup,
            OperationKind::TransactionLookup,
            OperationKind::CartAdd,
            OperationKind::CartClear,
            OperationKind::CartCreate,
            OperationKind::CartGet,
            OperationKind::CartModify,
        ]
    }

    /// Returns true for the shopping-cart operations.
    pub fn is_cart(&self) -> bool {
        matches!(
            self,
            OperationKind::CartAdd
                | OperationKind::CartClear
                | OperationKind::CartCreate
                | OperationKind::CartGet
                | OperationKind::CartModify
        )
    }

    /// Prefix used for batched parameter keys. Cart operations batch their
    /// items as `Item.N.*`.
    pub fn batch_prefix(&self) -> &'static str {
        if self.is_cart() {
            "Item"
        } else {
            self.name()
        }
    }

    /// Page parameter and page cap for this kind.
    ///
    /// `ItemLookup` can also page with `VariationPage` (150) and
    /// `ReviewPage` (20); offers are what gets paged here.
    pub fn pagination(&self) -> Pagination {
        match self {
            OperationKind::ItemSearch => Pagination { parameter: "ItemPage", max_page: 400 },
            OperationKind::ItemLookup => Pagination { parameter: "OfferPage", max_page: 100 },
            OperationKind::ListLookup => Pagination { parameter: "ProductPage", max_page: 30 },
            OperationKind::ListSearch => Pagination { parameter: "ListPage", max_page: 20 },
            OperationKind::CustomerContentLookup => {
                Pagination { parameter: "ReviewPage", max_page: 10 }
            }
            OperationKind::CustomerContentSearch => {
                Pagination { parameter: "CustomerPage", max_page: 20 }
            }
            _ => DEFAULT_PAGINATION,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OperationKind {
    type Err = EcsError;

    fn from_str(s: &str) -> Result<Self> {
        OperationKind::all()
            .iter()
            .find(|k| k.name() == s)
            .copied()
            .ok_or_else(|| EcsError::InvalidOperation(format!("bad operation: {}", s)))
    }
}

/// A request for one category of query, or two combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    kind: OperationKind,
    combined_with: Option<OperationKind>,
    params: Params,
}

impl Operation {
    /// Creates an operation from raw parameters without validating them.
    pub fn new(kind: OperationKind, params: Params) -> Self {
        Self { kind, combined_with: None, params }
    }

    /// Searches for items matching broad criteria within a search index.
    pub fn item_search(search_index: &str, search: Params) -> Result<Self> {
        if !SEARCH_INDICES.contains(&search_index) {
            return Err(EcsError::InvalidOperation(format!(
                "invalid search index: {}",
                search_index
            )));
        }
        if let Some(bad) = search.keys().find(|k| !SEARCH_PARAMETERS.contains(&k.as_str())) {
            return Err(EcsError::InvalidOperation(format!("bad parameter: {}", bad)));
        }

        let mut all = search;
        all.insert("SearchIndex".to_string(), search_index.to_string());
        Ok(Self::new(OperationKind::ItemSearch, all))
    }

    /// Looks up specific items by identifier. Each entry of `more` becomes
    /// an additional batched look-up sharing the same `IdType`.
    pub fn item_lookup(id_type: &str, lookup: Params, more: Vec<Params>) -> Self {
        Self::lookup(OperationKind::ItemLookup, id_type, lookup, more)
    }

    /// Looks up items for sale by one seller.
    pub fn seller_listing_lookup(
        seller_id: &str,
        id_type: &str,
        mut lookup: Params,
        more: Vec<Params>,
    ) -> Self {
        lookup.insert("SellerId".to_string(), seller_id.to_string());
        Self::lookup(OperationKind::SellerListingLookup, id_type, lookup, more)
    }

    fn lookup(kind: OperationKind, id_type: &str, lookup: Params, more: Vec<Params>) -> Self {
        if more.is_empty() {
            let mut all = lookup;
            all.insert("IdType".to_string(), id_type.to_string());
            return Self::new(kind, all);
        }

        let mut sets = vec![lookup];
        sets.extend(more);
        let mut all = batch_parameters(kind.batch_prefix(), &sets);
        all.insert(format!("{}.Shared.IdType", kind.name()), id_type.to_string());
        Self::new(kind, all)
    }

    /// Searches a seller's listings.
    pub fn seller_listing_search(seller_id: &str, search: Params) -> Self {
        Self::new(OperationKind::SellerListingSearch, with(search, "SellerId", seller_id))
    }

    /// Returns details of one seller.
    pub fn seller_lookup(seller_id: &str, extra: Params) -> Self {
        Self::new(OperationKind::SellerLookup, with(extra, "SellerId", seller_id))
    }

    /// Returns public data about a customer.
    pub fn customer_content_lookup(customer_id: &str, extra: Params) -> Self {
        Self::new(OperationKind::CustomerContentLookup, with(extra, "CustomerId", customer_id))
    }

    /// Finds customers by e-mail address (anything containing `@`) or name.
    pub fn customer_content_search(customer: &str) -> Self {
        let key = if customer.contains('@') { "Email" } else { "Name" };
        Self::new(OperationKind::CustomerContentSearch, params([(key, customer)]))
    }

    /// Searches wish lists, registries and similar customer lists.
    pub fn list_search(list_type: &str, search: Params) -> Self {
        Self::new(OperationKind::ListSearch, with(search, "ListType", list_type))
    }

    /// Returns one customer list.
    pub fn list_lookup(list_id: &str, list_type: &str, extra: Params) -> Self {
        let all = with(with(extra, "ListId", list_id), "ListType", list_type);
        Self::new(OperationKind::ListLookup, all)
    }

    /// Returns a browse node with its ancestors and children.
    pub fn browse_node_lookup(node: &str, extra: Params) -> Self {
        Self::new(OperationKind::BrowseNodeLookup, with(extra, "BrowseNodeId", node))
    }

    /// Finds items similar to all of `asins`.
    pub fn similarity_lookup(asins: &[&str], extra: Params) -> Self {
        Self::new(OperationKind::SimilarityLookup, with(extra, "ItemId", &asins.join(",")))
    }

    /// Finds entities labelled with a customer tag.
    pub fn tag_lookup(tag_name: &str, extra: Params) -> Self {
        Self::new(OperationKind::TagLookup, with(extra, "TagName", tag_name))
    }

    /// Returns a completed purchase by order number.
    pub fn transaction_lookup(transaction_id: &str) -> Self {
        Self::new(OperationKind::TransactionLookup, params([("TransactionId", transaction_id)]))
    }

    /// Asks the service about an operation or response group.
    pub fn help(help_type: &str, about: &str, extra: Params) -> Self {
        let all = with(with(extra, "HelpType", help_type), "About", about);
        Self::new(OperationKind::Help, all)
    }

    /// Combines two operations into one request.
    ///
    /// Parameters of both are rewritten into batch form. Response groups and
    /// pagination apply to the pair as a whole; only the first page of
    /// results is ever returned for a combined operation.
    pub fn combine(first: &Operation, second: &Operation) -> Self {
        let merged = if first.kind == second.kind {
            batch_parameters(first.kind.batch_prefix(), &[first.params.clone(), second.params.clone()])
        } else {
            let mut merged = batch_parameters(first.kind.batch_prefix(), &[first.params.clone()]);
            merged.extend(batch_parameters(second.kind.batch_prefix(), &[second.params.clone()]));
            merged
        };

        Self { kind: first.kind, combined_with: Some(second.kind), params: merged }
    }

    /// Primary kind. For a combined operation, the first one.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Second kind of a combined operation.
    pub fn combined_with(&self) -> Option<OperationKind> {
        self.combined_with
    }

    /// Returns true if this operation combines two.
    pub fn is_multiple(&self) -> bool {
        self.combined_with.is_some()
    }

    /// Value of the `Operation` parameter, e.g. `ItemSearch,ItemLookup`.
    pub fn label(&self) -> String {
        match self.combined_with {
            Some(second) => format!("{},{}", self.kind, second),
            None => self.kind.to_string(),
        }
    }

    /// All wire parameters, including `Operation`.
    pub fn params(&self) -> Params {
        let mut all = self.params.clone();
        all.insert("Operation".to_string(), self.label());
        all
    }

    /// Sets one parameter, replacing any previous value.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Returns one parameter value.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

fn with(mut base: Params, key: &str, value: &str) -> Params {
    base.insert(key.to_string(), value.to_string());
    base
}

/// Returns true if every key of `set` already has the `Prefix.N.Param` form.
fn is_batched(set: &Params) -> bool {
    !set.is_empty()
        && set.keys().all(|k| {
            let parts: Vec<&str> = k.splitn(3, '.').collect();
            parts.len() == 3 && parts.iter().all(|p| !p.is_empty())
        })
}

/// Rewrites parameter sets into batch form: the set at position `i` has each
/// key `K` renamed to `prefix.(i+1).K`. Sets that are already batched are
/// merged unchanged.
pub fn batch_parameters(prefix: &str, sets: &[Params]) -> Params {
    let mut out = Params::new();
    for (index, set) in sets.iter().enumerate() {
        if is_batched(set) {
            out.extend(set.iter().map(|(k, v)| (k.clone(), v.clone())));
            continue;
        }
        for (tag, value) in set {
            out.insert(format!("{}.{}.{}", prefix, index + 1, tag), value.clone());
        }
    }
    out
}

/// Named bundles of optional fields the service should include in its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseGroup {
    groups: Vec<String>,
}

impl ResponseGroup {
    /// Creates a response group set, defaulting to `Small` when empty.
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut groups: Vec<String> = groups.into_iter().map(Into::into).collect();
        if groups.is_empty() {
            groups.push("Small".to_string());
        }
        Self { groups }
    }

    /// Group names in the order given.
    pub fn list(&self) -> &[String] {
        &self.groups
    }

    /// The `ResponseGroup` wire parameter.
    pub fn param(&self) -> (&'static str, String) {
        ("ResponseGroup", self.groups.join(","))
    }
}

impl Default for ResponseGroup {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl FromStr for ResponseGroup {
    type Err = EcsError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::new(s.split(',').map(str::trim).filter(|g| !g.is_empty())))
    }
}
