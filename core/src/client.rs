//! Typed client for the Syndic8 XML-RPC directory.
//!
//! # Design
//! Every operation is a thin, typed wrapper over one primitive, `call`, which
//! namespaces the method, builds the XML-RPC request (`build_call`), hands it
//! to the `Transport` and parses the reply (`parse_response`). Wrappers only
//! arrange arguments in wire order and reshape results where the operation
//! says so (integer and flag coercion, folding record lists into maps).
//!
//! Optional parameters resolve against the session configuration when the
//! call is made, so changes to `keys`, `max_results` or `sort_field` apply to
//! every later call. Authenticated operations pass the username and password
//! digest as their first two arguments; the service enforces permissions and
//! answers with a fault when they are missing or insufficient.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use tracing::{debug, trace};

use crate::codec;
use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{FeedRecord, NewUser, QueryOperator};
use crate::value::Value;

/// `ping` / `extended_ping` live outside the directory namespace.
const PING_NAMESPACE: &str = "weblogUpdates";

/// Blocking client session for the feed directory.
///
/// Each instance owns its transport; use one instance per thread of control.
#[derive(Debug, Clone)]
pub struct DirectoryClient<T = UreqTransport> {
    config: ClientConfig,
    credentials: Credentials,
    url: String,
    transport: T,
}

impl DirectoryClient<UreqTransport> {
    /// Connect to the public service. The password, if any, is hashed here
    /// and never kept in plaintext.
    pub fn new(username: Option<&str>, password: Option<&str>) -> Result<Self, ApiError> {
        Self::with_config(
            ClientConfig::default(),
            Credentials::new(username, password),
            UreqTransport::new(),
        )
    }

    /// Connect without credentials; authenticated operations will fault.
    pub fn anonymous() -> Result<Self, ApiError> {
        Self::new(None, None)
    }
}

impl<T: Transport> DirectoryClient<T> {
    pub fn with_config(config: ClientConfig, credentials: Credentials, transport: T) -> Result<Self, ApiError> {
        config.endpoint.validate()?;
        let url = config.endpoint.url();
        debug!(%url, user = credentials.username().unwrap_or("-"), "directory client ready");
        Ok(Self {
            config,
            credentials,
            url,
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn keys(&self) -> &[String] {
        &self.config.keys
    }

    pub fn set_keys<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.keys = keys.into_iter().map(Into::into).collect();
    }

    pub fn max_results(&self) -> i64 {
        self.config.max_results
    }

    pub fn set_max_results(&mut self, max_results: i64) {
        self.config.max_results = max_results;
    }

    pub fn sort_field(&self) -> &str {
        &self.config.sort_field
    }

    pub fn set_sort_field(&mut self, sort_field: &str) {
        self.config.sort_field = sort_field.to_string();
    }

    // -----------------------------------------------------------------------
    // Call primitive
    // -----------------------------------------------------------------------

    /// Prefix the directory namespace unless `method` already carries one.
    pub fn qualify(&self, method: &str) -> String {
        if method.contains('.') {
            method.to_string()
        } else {
            format!("{}.{method}", self.config.namespace)
        }
    }

    /// Build the HTTP request for one remote call. `method` is sent as given.
    pub fn build_call(&self, method: &str, args: &[Value]) -> HttpRequest {
        HttpRequest {
            url: self.url.clone(),
            headers: vec![
                ("content-type".to_string(), "text/xml".to_string()),
                ("user-agent".to_string(), self.config.user_agent.clone()),
            ],
            body: codec::encode_call(method, args),
        }
    }

    /// Turn the HTTP response of a remote call into its decoded result.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value, ApiError> {
        if response.status != 200 {
            return Err(ApiError::Transport(format!(
                "HTTP {}: {}",
                response.status, response.body
            )));
        }
        codec::decode_response(&response.body)
    }

    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, ApiError> {
        let method = self.qualify(method);
        // Arguments are not logged: authenticated calls carry the password digest.
        debug!(method = %method, args = args.len(), "xml-rpc call");
        let request = self.build_call(&method, &args);
        let response = self.transport.execute(request)?;
        let result = self.parse_response(response);
        trace!(method = %method, ok = result.is_ok(), "xml-rpc call finished");
        result
    }

    fn authed_call(&self, method: &str, args: Vec<Value>) -> Result<Value, ApiError> {
        let mut full: Vec<Value> = self.credentials.auth_args().into();
        full.extend(args);
        self.call(method, full)
    }

    fn fields_or_keys(&self, fields: Option<&[String]>) -> Value {
        Value::from(fields.unwrap_or(&self.config.keys))
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Find feeds matching `query` and fetch their records.
    ///
    /// Runs `FindFeeds` sorted by site name and capped at `max_results`, then
    /// `GetFeedInfo` for the configured `keys`. No second call is made when
    /// nothing matched.
    pub fn search(&self, query: &str) -> Result<Vec<FeedRecord>, ApiError> {
        let ids = self
            .call(
                "FindFeeds",
                vec![query.into(), "sitename".into(), self.config.max_results.into()],
            )?
            .into_array()?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.feed_info(&ids, None)
    }

    /// Feed ids matching `query`, sorted by `sort_field` (default: the
    /// session's) and capped at `max_results` (default: the session's).
    pub fn find_feeds(
        &self,
        query: &str,
        sort_field: Option<&str>,
        max_results: Option<i64>,
    ) -> Result<Vec<Value>, ApiError> {
        let sort_field = sort_field.unwrap_or(&self.config.sort_field);
        let max_results = max_results.unwrap_or(self.config.max_results);
        self.call("FindFeeds", vec![query.into(), sort_field.into(), max_results.into()])?
            .into_array()
    }

    /// Ids of feeds whose site URL matches `query`.
    pub fn find_sites(&self, query: &str) -> Result<Vec<Value>, ApiError> {
        self.call("FindSites", vec![query.into()])?.into_array()
    }

    /// Ids of users whose text fields match `query`.
    pub fn find_users(&self, query: &str) -> Result<Vec<Value>, ApiError> {
        self.call("FindUsers", vec![query.into()])?.into_array()
    }

    /// Feed ids whose `field` relates to `value` by `operator`.
    pub fn query_feeds(
        &self,
        field: &str,
        operator: QueryOperator,
        value: impl Into<Value>,
        sort_field: Option<&str>,
    ) -> Result<Vec<Value>, ApiError> {
        let sort_field = sort_field.unwrap_or(&self.config.sort_field);
        self.call(
            "QueryFeeds",
            vec![field.into(), operator.as_str().into(), value.into(), sort_field.into()],
        )?
        .into_array()
    }

    // -----------------------------------------------------------------------
    // Categories and locations
    // -----------------------------------------------------------------------

    pub fn category_schemes(&self) -> Result<Vec<String>, ApiError> {
        self.call("GetCategorySchemes", Vec::new())?.into_strings()
    }

    pub fn category_roots(&self, scheme: &str) -> Result<Vec<String>, ApiError> {
        self.call("GetCategoryRoots", vec![scheme.into()])?.into_strings()
    }

    /// The whole category hierarchy of `scheme`, as the service shapes it.
    pub fn category_tree(&self, scheme: &str) -> Result<Value, ApiError> {
        self.call("GetCategoryTree", vec![scheme.into()])
    }

    pub fn category_children(&self, scheme: &str, category: &str) -> Result<Vec<String>, ApiError> {
        self.call("GetCategoryChildren", vec![scheme.into(), category.into()])?
            .into_strings()
    }

    pub fn feeds_in_category(&self, scheme: &str, category: &str) -> Result<Vec<Value>, ApiError> {
        self.call("GetFeedsInCategory", vec![scheme.into(), category.into()])?
            .into_array()
    }

    pub fn location_schemes(&self) -> Result<Vec<String>, ApiError> {
        self.call("GetLocationSchemes", Vec::new())?.into_strings()
    }

    // -----------------------------------------------------------------------
    // Feeds
    // -----------------------------------------------------------------------

    /// Feeds with a change logged between `start` and `end` (default: today)
    /// in any of `check_fields` (default: every field the service knows,
    /// which costs a `GetFeedFields` call). Returns `ret_fields` (default:
    /// the session's `keys`) for each.
    pub fn changed_feeds(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
        check_fields: Option<&[String]>,
        ret_fields: Option<&[String]>,
    ) -> Result<Vec<FeedRecord>, ApiError> {
        let start = format_date(start);
        let end = format_date(end.unwrap_or_else(|| Local::now().date_naive()));
        let check_fields = match check_fields {
            Some(fields) => Value::from(fields),
            None => Value::from(self.fields()?),
        };
        let ret_fields = self.fields_or_keys(ret_fields);
        self.call(
            "GetChangedFeeds",
            vec![check_fields, start.into(), end.into(), ret_fields],
        )?
        .into_records()
    }

    /// Number of feeds in the directory.
    pub fn feed_count(&self) -> Result<i64, ApiError> {
        self.call("GetFeedCount", Vec::new())?.coerce_int()
    }

    /// Alias of [`feed_count`](Self::feed_count).
    pub fn size(&self) -> Result<i64, ApiError> {
        self.feed_count()
    }

    /// Names of the fields a feed record can carry.
    pub fn fields(&self) -> Result<Vec<String>, ApiError> {
        self.call("GetFeedFields", Vec::new())?.into_strings()
    }

    /// One record per id holding `fields` (default: the session's `keys`).
    pub fn feed_info(&self, feed_ids: &[Value], fields: Option<&[String]>) -> Result<Vec<FeedRecord>, ApiError> {
        self.call(
            "GetFeedInfo",
            vec![Value::Array(feed_ids.to_vec()), self.fields_or_keys(fields)],
        )?
        .into_records()
    }

    /// Feed state codes mapped to their descriptions.
    pub fn states(&self) -> Result<BTreeMap<String, String>, ApiError> {
        fold_records(self.call("GetFeedStates", Vec::new())?, "state", "name")
    }

    /// Highest feed id assigned so far.
    pub fn last_feed(&self) -> Result<Value, ApiError> {
        self.call("GetLastFeed", Vec::new())
    }

    pub fn licenses(&self) -> Result<Vec<Value>, ApiError> {
        self.call("GetLicenses", Vec::new())?.into_array()
    }

    /// Toolkit ids mapped to toolkit names.
    pub fn toolkits(&self) -> Result<BTreeMap<String, String>, ApiError> {
        fold_records(self.call("GetToolkits", Vec::new())?, "id", "name")
    }

    pub fn user_info(&self, user_id: &str) -> Result<Value, ApiError> {
        self.call("GetUserInfo", vec![user_id.into()])
    }

    // -----------------------------------------------------------------------
    // Editing (Categorizer / Editor roles)
    // -----------------------------------------------------------------------

    pub fn set_feed_category(&self, feed_id: impl Into<Value>, scheme: &str, category: &str) -> Result<Value, ApiError> {
        self.authed_call("SetFeedCategory", vec![feed_id.into(), scheme.into(), category.into()])
    }

    pub fn set_feed_location(&self, feed_id: impl Into<Value>, scheme: &str, location: &str) -> Result<Value, ApiError> {
        self.authed_call("SetFeedLocation", vec![feed_id.into(), scheme.into(), location.into()])
    }

    pub fn set_user_location(&self, user_id: &str, location: &str) -> Result<Value, ApiError> {
        self.authed_call("SetUserLocation", vec![user_id.into(), location.into()])
    }

    /// Register `data_url` as a feed unless known; returns the feed id.
    ///
    /// The service identifies the suggester by username only.
    pub fn suggest_data_url(&self, data_url: &str) -> Result<Value, ApiError> {
        self.call("SuggestDataURL", vec![data_url.into(), self.credentials.username().into()])
    }

    /// Register `site_url` as a feed unless known; returns the feed id.
    pub fn suggest_site_url(&self, site_url: &str) -> Result<Value, ApiError> {
        self.call("SuggestSiteURL", vec![site_url.into(), self.credentials.username().into()])
    }

    /// Requires the CreateUser option. `true` when the account was created.
    pub fn create_user(&self, user: &NewUser) -> Result<bool, ApiError> {
        Ok(self.authed_call("CreateUser", user.to_args())?.coerce_flag())
    }

    // -----------------------------------------------------------------------
    // Weblog pings
    // -----------------------------------------------------------------------

    /// Notify the directory that `site_url` changed.
    pub fn ping(&self, site_name: &str, site_url: &str) -> Result<Value, ApiError> {
        self.call(
            &format!("{PING_NAMESPACE}.Ping"),
            vec![site_name.into(), site_url.into()],
        )
    }

    pub fn extended_ping(
        &self,
        site_name: &str,
        site_url: &str,
        unknown: impl Into<Value>,
        data_url: &str,
    ) -> Result<Value, ApiError> {
        self.call(
            &format!("{PING_NAMESPACE}.ExtendedPing"),
            vec![site_name.into(), site_url.into(), unknown.into(), data_url.into()],
        )
    }

    // -----------------------------------------------------------------------
    // Subscription lists (PersonalList option)
    // -----------------------------------------------------------------------

    /// Create a list (private unless `public`) and return its id.
    pub fn create_subscription_list(&self, name: &str, public: Option<bool>) -> Result<i64, ApiError> {
        self.authed_call(
            "CreateSubscriptionList",
            vec![name.into(), public.unwrap_or(false).into()],
        )?
        .coerce_int()
    }

    /// Create a list from the feeds linked on `html_url`. Returns one status
    /// record per feed found.
    pub fn create_subscription_list_from_html(
        &self,
        name: &str,
        public: bool,
        html_url: &str,
        auto_suggest: bool,
    ) -> Result<Vec<Value>, ApiError> {
        self.authed_call(
            "CreateSubscriptionListFromHTML",
            vec![name.into(), public.into(), html_url.into(), auto_suggest.into()],
        )?
        .into_array()
    }

    /// Create a list from the outlines of the OPML at `opml_url`.
    pub fn create_subscription_list_from_opml(
        &self,
        name: &str,
        public: bool,
        opml_url: &str,
        auto_suggest: bool,
    ) -> Result<Vec<Value>, ApiError> {
        self.authed_call(
            "CreateSubscriptionListFromOPML",
            vec![name.into(), public.into(), opml_url.into(), auto_suggest.into()],
        )?
        .into_array()
    }

    pub fn delete_subscription_list(&self, list_id: i64) -> Result<bool, ApiError> {
        Ok(self
            .authed_call("DeleteSubscriptionList", vec![list_id.into()])?
            .coerce_flag())
    }

    /// Feeds on the list, both direct and through subscribed categories.
    pub fn subscribed(&self, list_id: i64, fields: Option<&[String]>) -> Result<Vec<Value>, ApiError> {
        self.authed_call("GetSubscribed", vec![list_id.into(), fields.map(Value::from).into()])?
            .into_array()
    }

    pub fn subscribed_categories(&self, list_id: i64) -> Result<Vec<Value>, ApiError> {
        self.authed_call("GetSubscribedCategories", vec![list_id.into()])?
            .into_array()
    }

    pub fn subscription_lists(&self) -> Result<Vec<Value>, ApiError> {
        self.authed_call("GetSubscriptionLists", Vec::new())?.into_array()
    }

    /// Update the stored values (`name`, `public`, ...) of a list.
    pub fn set_subscription_list_info(
        &self,
        list_id: i64,
        new_values: BTreeMap<String, Value>,
    ) -> Result<Value, ApiError> {
        self.authed_call("SetSubscriptionListInfo", vec![list_id.into(), new_values.into()])
    }

    pub fn subscribe_category(&self, list_id: i64, scheme: &str, category: &str) -> Result<Value, ApiError> {
        self.authed_call(
            "SubscribeCategory",
            vec![scheme.into(), category.into(), list_id.into()],
        )
    }

    pub fn unsubscribe_category(&self, list_id: i64, scheme: &str, category: &str) -> Result<Value, ApiError> {
        self.authed_call(
            "UnSubscribeCategory",
            vec![scheme.into(), category.into(), list_id.into()],
        )
    }

    /// Subscribe list `list_id` (0 is the user's public list) to a feed.
    /// With `auto_suggest`, an unknown data URL is suggested as a new feed.
    pub fn subscribe_feed(&self, list_id: i64, feed_id: impl Into<Value>, auto_suggest: bool) -> Result<Value, ApiError> {
        self.authed_call(
            "SubscribeFeed",
            vec![feed_id.into(), list_id.into(), auto_suggest.into()],
        )
    }

    pub fn unsubscribe_feed(&self, list_id: i64, feed_id: impl Into<Value>) -> Result<Value, ApiError> {
        self.authed_call("UnSubscribeFeed", vec![feed_id.into(), list_id.into()])
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Fold `[{key: k, name: n}, ...]` into `{k: n}`; later duplicates win and
/// records without `key` are skipped.
fn fold_records(records: Value, key: &str, name: &str) -> Result<BTreeMap<String, String>, ApiError> {
    let mut folded = BTreeMap::new();
    for record in records.into_records()? {
        let Some(code) = record.get(key) else {
            continue;
        };
        let label = record.get(name).map(Value::to_string).unwrap_or_default();
        folded.insert(code.to_string(), label);
    }
    Ok(folded)
}
