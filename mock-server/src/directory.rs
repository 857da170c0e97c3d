//! In-memory feed directory behind the mock XML-RPC endpoint.
//!
//! Seeded from `seed.json`. Behaviour follows the public service closely
//! enough to exercise the client: namespaced method names, credentials as the
//! leading arguments of account operations, and role checks done here rather
//! than by the caller.

use std::collections::{BTreeMap, HashMap};

use md5::{Digest, Md5};
use serde::Deserialize;

use crate::xmlrpc::RpcValue;

pub const FAULT_METHOD_NOT_FOUND: i64 = -32601;
pub const FAULT_INVALID_PARAMS: i64 = -32602;
pub const FAULT_AUTH: i64 = 100;
pub const FAULT_PERMISSION: i64 = 101;
pub const FAULT_NOT_FOUND: i64 = 102;

#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub code: i64,
    pub message: String,
}

impl Fault {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn params(message: impl Into<String>) -> Self {
        Self::new(FAULT_INVALID_PARAMS, message)
    }
}

type RpcResult = Result<RpcValue, Fault>;

#[derive(Debug, Clone, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub sitename: String,
    pub siteurl: String,
    pub dataurl: String,
    pub description: String,
    pub status: String,
    #[serde(default)]
    pub categories: Vec<(String, String)>,
    /// `(YYYY-MM-DD, field)` change log entries.
    #[serde(default)]
    pub changes: Vec<(String, String)>,
}

pub const FEED_FIELDS: [&str; 6] = ["feedid", "sitename", "siteurl", "dataurl", "description", "status"];

impl Feed {
    fn field(&self, name: &str) -> Option<RpcValue> {
        match name {
            "feedid" => Some(RpcValue::Str(self.id.to_string())),
            "sitename" => Some(self.sitename.as_str().into()),
            "siteurl" => Some(self.siteurl.as_str().into()),
            "dataurl" => Some(self.dataurl.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            "status" => Some(self.status.as_str().into()),
            _ => None,
        }
    }

    fn record(&self, fields: &[String]) -> RpcValue {
        RpcValue::record(fields.iter().filter_map(|f| self.field(f).map(|v| (f.clone(), v))))
    }

    fn text(&self, name: &str) -> String {
        match self.field(name) {
            Some(RpcValue::Str(s)) => s,
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SeedUser {
    userid: String,
    password: String,
    first_name: String,
    last_name: String,
    email: String,
    location: String,
    roles: Vec<String>,
    options: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct User {
    pub userid: String,
    pub password_digest: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub location: String,
    pub roles: Vec<String>,
    pub options: Vec<String>,
}

impl User {
    fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubscriptionList {
    pub name: String,
    pub public: bool,
    pub feeds: Vec<i64>,
    pub categories: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct Seed {
    feeds: Vec<Feed>,
    users: Vec<SeedUser>,
    states: Vec<(String, String)>,
    toolkits: Vec<(i64, String)>,
    categories: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    licenses: Vec<serde_json::Value>,
    location_schemes: Vec<String>,
}

#[derive(Debug)]
pub struct Directory {
    feeds: Vec<Feed>,
    users: Vec<User>,
    states: Vec<(String, String)>,
    toolkits: Vec<(i64, String)>,
    categories: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    licenses: Vec<RpcValue>,
    location_schemes: Vec<String>,
    /// Keyed by owner and list id. List 0 is each user's public list.
    lists: HashMap<(String, i64), SubscriptionList>,
    next_list_id: i64,
    pings: Vec<(String, String)>,
}

pub fn digest(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}

impl Directory {
    /// The directory described by the bundled seed file.
    pub fn seeded() -> Self {
        let seed: Seed = serde_json::from_str(include_str!("seed.json")).expect("bundled seed.json is valid");
        Self {
            feeds: seed.feeds,
            users: seed
                .users
                .into_iter()
                .map(|u| User {
                    password_digest: digest(&u.password),
                    userid: u.userid,
                    first_name: u.first_name,
                    last_name: u.last_name,
                    email: u.email,
                    location: u.location,
                    roles: u.roles,
                    options: u.options,
                })
                .collect(),
            states: seed.states,
            toolkits: seed.toolkits,
            categories: seed.categories,
            licenses: seed.licenses.iter().map(from_json).collect(),
            location_schemes: seed.location_schemes,
            lists: HashMap::new(),
            next_list_id: 1,
            pings: Vec::new(),
        }
    }

    pub fn pings(&self) -> &[(String, String)] {
        &self.pings
    }

    /// Execute one call.
    pub fn dispatch(&mut self, method: &str, params: &[RpcValue]) -> RpcResult {
        let p = Params(params);
        match method {
            "syndic8.FindFeeds" => self.find_feeds(p.str(0)?, p.str(1)?, p.int(2)?),
            "syndic8.FindSites" => Ok(self.ids_where(|f| contains(&f.siteurl, p.str(0).unwrap_or_default()))),
            "syndic8.FindUsers" => self.find_users(p.str(0)?),
            "syndic8.GetFeedInfo" => self.feed_info(p.array(0)?, &p.strings(1)?),
            "syndic8.GetFeedFields" => Ok(RpcValue::from(FEED_FIELDS.to_vec())),
            "syndic8.GetFeedCount" => Ok(RpcValue::Str(self.feeds.len().to_string())),
            "syndic8.GetLastFeed" => Ok(RpcValue::Int(self.feeds.iter().map(|f| f.id).max().unwrap_or(0))),
            "syndic8.GetFeedStates" => Ok(RpcValue::Array(
                self.states
                    .iter()
                    .map(|(state, name)| RpcValue::record([("state", state.as_str().into()), ("name", name.as_str().into())]))
                    .collect(),
            )),
            "syndic8.GetToolkits" => Ok(RpcValue::Array(
                self.toolkits
                    .iter()
                    .map(|(id, name)| RpcValue::record([("id", RpcValue::Int(*id)), ("name", name.as_str().into())]))
                    .collect(),
            )),
            "syndic8.GetLicenses" => Ok(RpcValue::Array(self.licenses.clone())),
            "syndic8.GetLocationSchemes" => Ok(RpcValue::from(self.location_schemes.clone())),
            "syndic8.GetCategorySchemes" => Ok(RpcValue::from(self.categories.keys().cloned().collect::<Vec<_>>())),
            "syndic8.GetCategoryRoots" => self.category_roots(p.str(0)?),
            "syndic8.GetCategoryTree" => self.category_tree(p.str(0)?),
            "syndic8.GetCategoryChildren" => self.category_children(p.str(0)?, p.str(1)?),
            "syndic8.GetFeedsInCategory" => {
                let (scheme, category) = (p.str(0)?, p.str(1)?);
                Ok(self.ids_where(|f| in_category(f, scheme, category)))
            }
            "syndic8.GetChangedFeeds" => {
                self.changed_feeds(&p.strings(0)?, p.str(1)?, p.str(2)?, &p.strings(3)?)
            }
            "syndic8.QueryFeeds" => self.query_feeds(p.str(0)?, p.str(1)?, p.str(2)?, p.str(3)?),
            "syndic8.GetUserInfo" => self.user_info(p.str(0)?),
            "syndic8.SuggestDataURL" => Ok(RpcValue::Int(self.suggest(p.str(0)?, true))),
            "syndic8.SuggestSiteURL" => Ok(RpcValue::Int(self.suggest(p.str(0)?, false))),
            "weblogUpdates.Ping" | "weblogUpdates.ExtendedPing" => {
                self.pings.push((p.str(0)?.to_string(), p.str(1)?.to_string()));
                Ok(RpcValue::record([
                    ("flerror", RpcValue::Bool(false)),
                    ("message", "Thanks for the ping.".into()),
                ]))
            }
            _ => self.dispatch_authed(method, p),
        }
    }

    fn dispatch_authed(&mut self, method: &str, p: Params<'_>) -> RpcResult {
        let known = matches!(
            method,
            "syndic8.SetFeedCategory"
                | "syndic8.SetFeedLocation"
                | "syndic8.SetUserLocation"
                | "syndic8.CreateUser"
                | "syndic8.CreateSubscriptionList"
                | "syndic8.CreateSubscriptionListFromHTML"
                | "syndic8.CreateSubscriptionListFromOPML"
                | "syndic8.DeleteSubscriptionList"
                | "syndic8.GetSubscribed"
                | "syndic8.GetSubscribedCategories"
                | "syndic8.GetSubscriptionLists"
                | "syndic8.SetSubscriptionListInfo"
                | "syndic8.SubscribeCategory"
                | "syndic8.UnSubscribeCategory"
                | "syndic8.SubscribeFeed"
                | "syndic8.UnSubscribeFeed"
        );
        if !known {
            return Err(Fault::new(FAULT_METHOD_NOT_FOUND, format!("method {method} not found")));
        }

        let user = self.authenticate(p.0.first(), p.0.get(1))?;
        let p = Params(p.0.get(2..).unwrap_or_default());
        match method {
            "syndic8.SetFeedCategory" => {
                self.require_role(&user, "Categorizer")?;
                let (scheme, category) = (p.str(1)?.to_string(), p.str(2)?.to_string());
                let feed = self.feed_mut(p.int(0)?)?;
                feed.categories.retain(|(s, _)| *s != scheme);
                feed.categories.push((scheme, category));
                Ok(RpcValue::Int(1))
            }
            "syndic8.SetFeedLocation" => {
                self.require_role(&user, "Categorizer")?;
                self.feed_mut(p.int(0)?)?;
                Ok(RpcValue::Int(1))
            }
            "syndic8.SetUserLocation" => {
                self.require_role(&user, "Editor")?;
                let location = p.str(1)?.to_string();
                let target = self
                    .users
                    .iter_mut()
                    .find(|u| u.userid == p.str(0).unwrap_or_default())
                    .ok_or_else(|| Fault::new(FAULT_NOT_FOUND, "no such user"))?;
                target.location = location;
                Ok(RpcValue::Int(1))
            }
            "syndic8.CreateUser" => {
                if !user.has_option("CreateUser") {
                    return Err(Fault::new(FAULT_PERMISSION, "CreateUser option required"));
                }
                let userid = p.str(0)?;
                if self.users.iter().any(|u| u.userid == userid) {
                    return Ok(RpcValue::Str("0".to_string()));
                }
                self.users.push(User {
                    userid: userid.to_string(),
                    first_name: p.str(1)?.to_string(),
                    last_name: p.str(2)?.to_string(),
                    email: p.str(3)?.to_string(),
                    password_digest: digest(p.str(4)?),
                    roles: split_list(p.str(5)?),
                    options: split_list(p.str(6)?),
                    location: String::new(),
                });
                Ok(RpcValue::Str("1".to_string()))
            }
            _ => {
                if !user.has_option("PersonalList") {
                    return Err(Fault::new(FAULT_PERMISSION, "PersonalList option required"));
                }
                self.dispatch_lists(method, &user.userid, p)
            }
        }
    }

    fn dispatch_lists(&mut self, method: &str, owner: &str, p: Params<'_>) -> RpcResult {
        match method {
            "syndic8.CreateSubscriptionList" => {
                let public = p.0.get(1).and_then(RpcValue::as_bool).unwrap_or(false);
                let id = self.create_list(owner, p.str(0)?, public);
                Ok(RpcValue::Str(id.to_string()))
            }
            "syndic8.CreateSubscriptionListFromHTML" | "syndic8.CreateSubscriptionListFromOPML" => {
                // Source documents are not fetched; the list starts empty.
                let public = p.0.get(1).and_then(RpcValue::as_bool).unwrap_or(false);
                self.create_list(owner, p.str(0)?, public);
                Ok(RpcValue::Array(Vec::new()))
            }
            "syndic8.DeleteSubscriptionList" => {
                let removed = self.lists.remove(&(owner.to_string(), p.int(0)?)).is_some();
                Ok(RpcValue::Int(i64::from(removed)))
            }
            "syndic8.GetSubscriptionLists" => {
                let mut lists: Vec<_> = self.lists.iter().filter(|((o, _), _)| o == owner).collect();
                lists.sort_by_key(|((_, id), _)| *id);
                Ok(RpcValue::Array(
                    lists
                        .into_iter()
                        .map(|((_, id), list)| {
                            RpcValue::record([
                                ("list_id", RpcValue::Int(*id)),
                                ("name", list.name.as_str().into()),
                                ("public", RpcValue::Bool(list.public)),
                            ])
                        })
                        .collect(),
                ))
            }
            "syndic8.GetSubscribed" => {
                let fields = match p.0.get(1) {
                    None | Some(RpcValue::Nil) => vec!["feedid".to_string(), "sitename".to_string(), "dataurl".to_string()],
                    Some(_) => p.strings(1)?,
                };
                let list = self.list(owner, p.int(0)?)?.clone();
                let records = self
                    .feeds
                    .iter()
                    .filter(|f| {
                        list.feeds.contains(&f.id)
                            || list.categories.iter().any(|(s, c)| in_category(f, s, c))
                    })
                    .map(|f| f.record(&fields))
                    .collect();
                Ok(RpcValue::Array(records))
            }
            "syndic8.GetSubscribedCategories" => {
                let list = self.list(owner, p.int(0)?)?;
                Ok(RpcValue::Array(
                    list.categories
                        .iter()
                        .map(|(s, c)| RpcValue::record([("scheme", s.as_str().into()), ("category", c.as_str().into())]))
                        .collect(),
                ))
            }
            "syndic8.SetSubscriptionListInfo" => {
                let values = match p.0.get(1) {
                    Some(RpcValue::Struct(values)) => values.clone(),
                    _ => return Err(Fault::params("expected struct of new values")),
                };
                let list = self.list_mut(owner, p.int(0)?)?;
                if let Some(name) = values.get("name").and_then(RpcValue::as_str) {
                    list.name = name.to_string();
                }
                if let Some(public) = values.get("public").and_then(RpcValue::as_bool) {
                    list.public = public;
                }
                Ok(RpcValue::Int(1))
            }
            "syndic8.SubscribeCategory" | "syndic8.UnSubscribeCategory" => {
                let entry = (p.str(0)?.to_string(), p.str(1)?.to_string());
                if !self.category_exists(&entry.0, &entry.1) {
                    return Err(Fault::new(FAULT_NOT_FOUND, format!("no category {}/{}", entry.0, entry.1)));
                }
                let list = self.list_mut(owner, p.int(2)?)?;
                list.categories.retain(|c| *c != entry);
                if method == "syndic8.SubscribeCategory" {
                    list.categories.push(entry);
                }
                Ok(RpcValue::Int(1))
            }
            "syndic8.SubscribeFeed" => {
                let auto_suggest = p.0.get(2).and_then(RpcValue::as_bool).unwrap_or(false);
                let feed_id = self.resolve_feed(p.0.first(), auto_suggest)?;
                let list = self.list_mut(owner, p.int(1)?)?;
                if !list.feeds.contains(&feed_id) {
                    list.feeds.push(feed_id);
                }
                Ok(RpcValue::Int(1))
            }
            "syndic8.UnSubscribeFeed" => {
                let feed_id = self.resolve_feed(p.0.first(), false)?;
                let list = self.list_mut(owner, p.int(1)?)?;
                list.feeds.retain(|id| *id != feed_id);
                Ok(RpcValue::Int(1))
            }
            other => Err(Fault::new(FAULT_METHOD_NOT_FOUND, format!("method {other} not found"))),
        }
    }

    fn authenticate(&self, user: Option<&RpcValue>, digest: Option<&RpcValue>) -> Result<User, Fault> {
        let (Some(user), Some(digest)) = (user.and_then(RpcValue::as_str), digest.and_then(RpcValue::as_str)) else {
            return Err(Fault::new(FAULT_AUTH, "login required"));
        };
        self.users
            .iter()
            .find(|u| u.userid == user && u.password_digest == digest)
            .cloned()
            .ok_or_else(|| Fault::new(FAULT_AUTH, "invalid username or password"))
    }

    fn require_role(&self, user: &User, role: &str) -> Result<(), Fault> {
        if user.has_role(role) {
            Ok(())
        } else {
            Err(Fault::new(FAULT_PERMISSION, format!("{role} role required")))
        }
    }

    fn find_feeds(&self, query: &str, sort_field: &str, max: i64) -> RpcResult {
        let mut matches: Vec<&Feed> = self
            .feeds
            .iter()
            .filter(|f| contains(&f.sitename, query) || contains(&f.description, query) || contains(&f.siteurl, query))
            .collect();
        matches.sort_by_key(|f| f.text(sort_field).to_lowercase());
        if let Ok(max) = usize::try_from(max) {
            matches.truncate(max);
        }
        Ok(RpcValue::Array(matches.into_iter().map(|f| RpcValue::Int(f.id)).collect()))
    }

    fn find_users(&self, query: &str) -> RpcResult {
        Ok(RpcValue::Array(
            self.users
                .iter()
                .filter(|u| {
                    [&u.userid, &u.first_name, &u.last_name, &u.email, &u.location]
                        .iter()
                        .any(|field| contains(field, query))
                })
                .map(|u| u.userid.as_str().into())
                .collect(),
        ))
    }

    fn feed_info(&self, ids: &[RpcValue], fields: &[String]) -> RpcResult {
        Ok(RpcValue::Array(
            ids.iter()
                .filter_map(RpcValue::as_i64)
                .filter_map(|id| self.feeds.iter().find(|f| f.id == id))
                .map(|f| f.record(fields))
                .collect(),
        ))
    }

    fn ids_where(&self, pred: impl Fn(&Feed) -> bool) -> RpcValue {
        RpcValue::Array(self.feeds.iter().filter(|f| pred(f)).map(|f| RpcValue::Int(f.id)).collect())
    }

    fn category_roots(&self, scheme: &str) -> RpcResult {
        let roots = self.scheme(scheme)?;
        Ok(RpcValue::from(roots.keys().cloned().collect::<Vec<_>>()))
    }

    fn category_tree(&self, scheme: &str) -> RpcResult {
        let roots = self.scheme(scheme)?;
        Ok(RpcValue::Struct(
            roots
                .iter()
                .map(|(root, children)| (root.clone(), RpcValue::from(children.clone())))
                .collect(),
        ))
    }

    fn category_children(&self, scheme: &str, category: &str) -> RpcResult {
        let roots = self.scheme(scheme)?;
        let children = roots.get(category).cloned().unwrap_or_default();
        Ok(RpcValue::from(children))
    }

    fn scheme(&self, scheme: &str) -> Result<&BTreeMap<String, Vec<String>>, Fault> {
        self.categories
            .get(scheme)
            .ok_or_else(|| Fault::new(FAULT_NOT_FOUND, format!("no category scheme {scheme}")))
    }

    fn category_exists(&self, scheme: &str, category: &str) -> bool {
        self.categories.get(scheme).is_some_and(|roots| {
            roots.contains_key(category) || roots.values().any(|kids| kids.iter().any(|k| k == category))
        })
    }

    fn changed_feeds(&self, check: &[String], start: &str, end: &str, ret: &[String]) -> RpcResult {
        Ok(RpcValue::Array(
            self.feeds
                .iter()
                .filter(|f| {
                    f.changes.iter().any(|(date, field)| {
                        date.as_str() >= start && date.as_str() <= end && check.iter().any(|c| c == field)
                    })
                })
                .map(|f| f.record(ret))
                .collect(),
        ))
    }

    fn query_feeds(&self, field: &str, op: &str, value: &str, sort_field: &str) -> RpcResult {
        if !FEED_FIELDS.contains(&field) {
            return Err(Fault::params(format!("unknown field {field}")));
        }
        if !["=", "!=", "<", ">", "<=", ">=", "like", "regexp"].contains(&op) {
            return Err(Fault::params(format!("unknown operator {op}")));
        }
        let mut matches: Vec<&Feed> = self.feeds.iter().filter(|f| compare(&f.text(field), op, value)).collect();
        matches.sort_by_key(|f| f.text(sort_field).to_lowercase());
        Ok(RpcValue::Array(matches.into_iter().map(|f| RpcValue::Int(f.id)).collect()))
    }

    fn user_info(&self, userid: &str) -> RpcResult {
        let user = self
            .users
            .iter()
            .find(|u| u.userid == userid)
            .ok_or_else(|| Fault::new(FAULT_NOT_FOUND, format!("no such user {userid}")))?;
        Ok(RpcValue::record([
            ("userid", user.userid.as_str().into()),
            ("firstname", user.first_name.as_str().into()),
            ("lastname", user.last_name.as_str().into()),
            ("email", user.email.as_str().into()),
            ("location", user.location.as_str().into()),
            ("roles", user.roles.join(",").into()),
        ]))
    }

    /// Id of the feed with this data (or site) URL, registering it if new.
    fn suggest(&mut self, url: &str, is_data_url: bool) -> i64 {
        let existing = self
            .feeds
            .iter()
            .find(|f| if is_data_url { f.dataurl == url } else { f.siteurl == url });
        if let Some(feed) = existing {
            return feed.id;
        }
        let id = self.feeds.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        self.feeds.push(Feed {
            id,
            sitename: url.to_string(),
            siteurl: if is_data_url { String::new() } else { url.to_string() },
            dataurl: if is_data_url { url.to_string() } else { String::new() },
            description: String::new(),
            status: "Suggested".to_string(),
            categories: Vec::new(),
            changes: Vec::new(),
        });
        id
    }

    /// A feed argument is either a numeric id or a data URL.
    fn resolve_feed(&mut self, feed: Option<&RpcValue>, auto_suggest: bool) -> Result<i64, Fault> {
        let feed = feed.ok_or_else(|| Fault::params("missing feed"))?;
        if let Some(id) = feed.as_i64() {
            return self
                .feeds
                .iter()
                .any(|f| f.id == id)
                .then_some(id)
                .ok_or_else(|| Fault::new(FAULT_NOT_FOUND, format!("no feed {id}")));
        }
        let url = feed.as_str().ok_or_else(|| Fault::params("feed must be an id or data URL"))?;
        match self.feeds.iter().find(|f| f.dataurl == url) {
            Some(f) => Ok(f.id),
            None if auto_suggest => Ok(self.suggest(url, true)),
            None => Err(Fault::new(FAULT_NOT_FOUND, format!("unknown feed {url}"))),
        }
    }

    fn feed_mut(&mut self, id: i64) -> Result<&mut Feed, Fault> {
        self.feeds
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| Fault::new(FAULT_NOT_FOUND, format!("no feed {id}")))
    }

    fn create_list(&mut self, owner: &str, name: &str, public: bool) -> i64 {
        let id = self.next_list_id;
        self.next_list_id += 1;
        self.lists.insert(
            (owner.to_string(), id),
            SubscriptionList {
                name: name.to_string(),
                public,
                ..SubscriptionList::default()
            },
        );
        id
    }

    fn list(&mut self, owner: &str, id: i64) -> Result<&SubscriptionList, Fault> {
        self.list_mut(owner, id).map(|l| &*l)
    }

    fn list_mut(&mut self, owner: &str, id: i64) -> Result<&mut SubscriptionList, Fault> {
        let key = (owner.to_string(), id);
        if id == 0 {
            return Ok(self.lists.entry(key).or_insert_with(|| SubscriptionList {
                name: "Public".to_string(),
                public: true,
                ..SubscriptionList::default()
            }));
        }
        self.lists
            .get_mut(&key)
            .ok_or_else(|| Fault::new(FAULT_NOT_FOUND, format!("no subscription list {id}")))
    }
}

/// Positional parameter access with invalid-params faults.
#[derive(Clone, Copy)]
struct Params<'a>(&'a [RpcValue]);

impl<'a> Params<'a> {
    fn str(&self, i: usize) -> Result<&'a str, Fault> {
        self.0
            .get(i)
            .and_then(RpcValue::as_str)
            .ok_or_else(|| Fault::params(format!("parameter {i} must be a string")))
    }

    fn int(&self, i: usize) -> Result<i64, Fault> {
        self.0
            .get(i)
            .and_then(RpcValue::as_i64)
            .ok_or_else(|| Fault::params(format!("parameter {i} must be an integer")))
    }

    fn array(&self, i: usize) -> Result<&'a [RpcValue], Fault> {
        match self.0.get(i) {
            Some(RpcValue::Array(items)) => Ok(items),
            _ => Err(Fault::params(format!("parameter {i} must be an array"))),
        }
    }

    fn strings(&self, i: usize) -> Result<Vec<String>, Fault> {
        self.0
            .get(i)
            .and_then(RpcValue::as_strings)
            .ok_or_else(|| Fault::params(format!("parameter {i} must be an array of strings")))
    }
}

fn compare(actual: &str, op: &str, expected: &str) -> bool {
    match op {
        "=" => actual == expected,
        "!=" => actual != expected,
        "<" => actual < expected,
        ">" => actual > expected,
        "<=" => actual <= expected,
        ">=" => actual >= expected,
        // Pattern operators are approximated by case-insensitive substring.
        _ => contains(actual, expected.trim_matches('%')),
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn in_category(feed: &Feed, scheme: &str, category: &str) -> bool {
    feed.categories.iter().any(|(s, c)| s == scheme && c == category)
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

fn from_json(value: &serde_json::Value) -> RpcValue {
    match value {
        serde_json::Value::Null => RpcValue::Nil,
        serde_json::Value::Bool(b) => RpcValue::Bool(*b),
        serde_json::Value::Number(n) => n.as_i64().map_or_else(|| RpcValue::Double(n.as_f64().unwrap_or_default()), RpcValue::Int),
        serde_json::Value::String(s) => RpcValue::Str(s.clone()),
        serde_json::Value::Array(items) => RpcValue::Array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(members) => {
            RpcValue::Struct(members.iter().map(|(k, v)| (k.clone(), from_json(v))).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joebob() -> [RpcValue; 2] {
        ["joebob".into(), digest("p455w3rd").into()]
    }

    fn call(dir: &mut Directory, method: &str, mut params: Vec<RpcValue>, authed: bool) -> RpcResult {
        if authed {
            let mut full = joebob().to_vec();
            full.append(&mut params);
            params = full;
        }
        dir.dispatch(method, &params)
    }

    #[test]
    fn find_feeds_sorts_and_caps() {
        let mut dir = Directory::seeded();
        let ids = call(&mut dir, "syndic8.FindFeeds", vec!["cooking".into(), "sitename".into(), RpcValue::Int(2)], false).unwrap();
        assert_eq!(ids, RpcValue::Array(vec![RpcValue::Int(3), RpcValue::Int(2)]));
    }

    #[test]
    fn unlimited_find_returns_all_matches() {
        let mut dir = Directory::seeded();
        let ids = call(&mut dir, "syndic8.FindFeeds", vec!["cooking".into(), "sitename".into(), RpcValue::Int(-1)], false).unwrap();
        assert_eq!(ids, RpcValue::Array(vec![RpcValue::Int(3), RpcValue::Int(2), RpcValue::Int(1)]));
    }

    #[test]
    fn unknown_method_faults() {
        let mut dir = Directory::seeded();
        let fault = dir.dispatch("syndic8.Frobnicate", &[]).unwrap_err();
        assert_eq!(fault.code, FAULT_METHOD_NOT_FOUND);
    }

    #[test]
    fn wrong_password_faults() {
        let mut dir = Directory::seeded();
        let params = vec!["joebob".into(), digest("nope").into()];
        let fault = dir.dispatch("syndic8.GetSubscriptionLists", &params).unwrap_err();
        assert_eq!(fault.code, FAULT_AUTH);
    }

    #[test]
    fn categorizer_role_is_enforced() {
        let mut dir = Directory::seeded();
        let fault = call(&mut dir, "syndic8.SetFeedCategory", vec![RpcValue::Int(1), "NIF".into(), "Health".into()], true).unwrap_err();
        assert_eq!(fault.code, FAULT_PERMISSION);
    }

    #[test]
    fn list_lifecycle() {
        let mut dir = Directory::seeded();
        let id = call(&mut dir, "syndic8.CreateSubscriptionList", vec!["Links".into(), RpcValue::Bool(false)], true)
            .unwrap()
            .as_i64()
            .unwrap();
        call(&mut dir, "syndic8.SubscribeFeed", vec!["http://pablotron.org/rss/".into(), RpcValue::Int(id), RpcValue::Bool(false)], true).unwrap();
        call(&mut dir, "syndic8.SubscribeCategory", vec!["NIF".into(), "Health".into(), RpcValue::Int(id)], true).unwrap();

        let feeds = call(&mut dir, "syndic8.GetSubscribed", vec![RpcValue::Int(id), RpcValue::Nil], true).unwrap();
        let RpcValue::Array(feeds) = feeds else { panic!("expected array") };
        assert_eq!(feeds.len(), 3);

        let deleted = call(&mut dir, "syndic8.DeleteSubscriptionList", vec![RpcValue::Int(id)], true).unwrap();
        assert_eq!(deleted, RpcValue::Int(1));
        let fault = call(&mut dir, "syndic8.GetSubscribed", vec![RpcValue::Int(id), RpcValue::Nil], true).unwrap_err();
        assert_eq!(fault.code, FAULT_NOT_FOUND);
    }

    #[test]
    fn suggest_registers_unknown_urls_once() {
        let mut dir = Directory::seeded();
        let first = call(&mut dir, "syndic8.SuggestDataURL", vec!["http://new.example/rss".into(), "joebob".into()], false).unwrap();
        let again = call(&mut dir, "syndic8.SuggestDataURL", vec!["http://new.example/rss".into(), "joebob".into()], false).unwrap();
        assert_eq!(first, RpcValue::Int(5));
        assert_eq!(again, first);
    }

    #[test]
    fn changed_feeds_filters_by_date_and_field() {
        let mut dir = Directory::seeded();
        let changed = call(
            &mut dir,
            "syndic8.GetChangedFeeds",
            vec![RpcValue::from(vec!["description"]), "2004-01-01".into(), "2004-12-31".into(), RpcValue::from(vec!["sitename"])],
            false,
        )
        .unwrap();
        assert_eq!(changed, RpcValue::Array(vec![RpcValue::record([("sitename", RpcValue::from("Linux Weekly Digest"))])]));
    }
}
