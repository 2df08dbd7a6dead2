use log::warn;
use std::collections::HashMap;
use std::fmt;
use url::{Position, Url};

use crate::model::Role;

/// Origin used only to parse relative navigation targets.
const APP_ORIGIN: &str = "http://tesseract.local/";
const ROOT_REDIRECT: &str = "/dashboard";
const CATCH_ALL_PARAM: &str = "pathMatch";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    Dashboard,
    Investment,
    Portfolio,
    Dividends,
    TradingBots,
    Admin,
    AdminOverview,
    AdminInvestors,
    AdminDividends,
    AdminSystem,
    Login,
    Register,
    Profile,
    Settings,
    Transactions,
    TransactionDetail,
    BotDetail,
    BotConfigure,
    Unauthorized,
    NotFound,
}

impl RouteName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteName::Dashboard => "Dashboard",
            RouteName::Investment => "Investment",
            RouteName::Portfolio => "Portfolio",
            RouteName::Dividends => "Dividends",
            RouteName::TradingBots => "TradingBots",
            RouteName::Admin => "Admin",
            RouteName::AdminOverview => "AdminOverview",
            RouteName::AdminInvestors => "AdminInvestors",
            RouteName::AdminDividends => "AdminDividends",
            RouteName::AdminSystem => "AdminSystem",
            RouteName::Login => "Login",
            RouteName::Register => "Register",
            RouteName::Profile => "Profile",
            RouteName::Settings => "Settings",
            RouteName::Transactions => "Transactions",
            RouteName::TransactionDetail => "TransactionDetail",
            RouteName::BotDetail => "BotDetail",
            RouteName::BotConfigure => "BotConfigure",
            RouteName::Unauthorized => "Unauthorized",
            RouteName::NotFound => "NotFound",
        }
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    pub requires_manager: bool,
    pub requires_guest: bool,
    pub title: &'static str,
    pub breadcrumb: Option<&'static str>,
    pub admin_tab: Option<&'static str>,
    pub hide_navigation: bool,
}

impl RouteMeta {
    const fn public(title: &'static str) -> Self {
        Self {
            requires_auth: false,
            requires_manager: false,
            requires_guest: false,
            title,
            breadcrumb: None,
            admin_tab: None,
            hide_navigation: true,
        }
    }

    const fn guest(title: &'static str) -> Self {
        Self {
            requires_guest: true,
            ..Self::public(title)
        }
    }

    const fn page(title: &'static str, breadcrumb: &'static str) -> Self {
        Self {
            requires_auth: true,
            breadcrumb: Some(breadcrumb),
            hide_navigation: false,
            ..Self::public(title)
        }
    }

    const fn manager_page(title: &'static str, breadcrumb: &'static str) -> Self {
        Self {
            requires_manager: true,
            ..Self::page(title, breadcrumb)
        }
    }

    const fn admin_tab(title: &'static str, tab: &'static str) -> Self {
        Self {
            requires_auth: true,
            requires_manager: true,
            admin_tab: Some(tab),
            hide_navigation: false,
            ..Self::public(title)
        }
    }
}

#[derive(Debug)]
pub struct RouteDef {
    pub pattern: &'static str,
    pub name: RouteName,
    pub meta: RouteMeta,
}

const fn route(pattern: &'static str, name: RouteName, meta: RouteMeta) -> RouteDef {
    RouteDef { pattern, name, meta }
}

/// Matched in order; the final entry catches everything else.
static ROUTES: [RouteDef; 20] = [
    route("/dashboard", RouteName::Dashboard, RouteMeta::page("Dashboard - Tesseract Fund", "Dashboard")),
    route("/invest", RouteName::Investment, RouteMeta::page("Invest & Divest - Tesseract Fund", "Investment")),
    route("/portfolio", RouteName::Portfolio, RouteMeta::page("Portfolio - Tesseract Fund", "Portfolio")),
    route("/dividends", RouteName::Dividends, RouteMeta::page("Dividends - Tesseract Fund", "Dividends")),
    route("/trading-bots", RouteName::TradingBots, RouteMeta::page("Trading Bots - Tesseract Fund", "Trading Bots")),
    route("/admin", RouteName::Admin, RouteMeta::manager_page("Administration - Tesseract Fund", "Administration")),
    route("/admin/overview", RouteName::AdminOverview, RouteMeta::admin_tab("Fund Overview - Admin", "overview")),
    route("/admin/investors", RouteName::AdminInvestors, RouteMeta::admin_tab("Investor Management - Admin", "investors")),
    route("/admin/dividends", RouteName::AdminDividends, RouteMeta::admin_tab("Dividend Management - Admin", "dividends")),
    route("/admin/system", RouteName::AdminSystem, RouteMeta::admin_tab("System Settings - Admin", "system")),
    route("/login", RouteName::Login, RouteMeta::guest("Login - Tesseract Fund")),
    route("/register", RouteName::Register, RouteMeta::guest("Register - Tesseract Fund")),
    route("/profile", RouteName::Profile, RouteMeta::page("Profile - Tesseract Fund", "Profile")),
    route("/settings", RouteName::Settings, RouteMeta::page("Settings - Tesseract Fund", "Settings")),
    route("/transactions", RouteName::Transactions, RouteMeta::page("Transaction History - Tesseract Fund", "Transactions")),
    route("/transactions/:id", RouteName::TransactionDetail, RouteMeta::page("Transaction Details - Tesseract Fund", "Transaction Details")),
    route("/bots/:id", RouteName::BotDetail, RouteMeta::page("Bot Details - Tesseract Fund", "Bot Details")),
    route("/bots/:id/configure", RouteName::BotConfigure, RouteMeta::manager_page("Configure Bot - Tesseract Fund", "Configure Bot")),
    route("/unauthorized", RouteName::Unauthorized, RouteMeta::public("Unauthorized - Tesseract Fund")),
    route("/:pathMatch(.*)*", RouteName::NotFound, RouteMeta::public("Page Not Found - Tesseract Fund")),
];

pub fn route_table() -> &'static [RouteDef] {
    &ROUTES
}

pub fn route_by_name(name: RouteName) -> Option<&'static RouteDef> {
    ROUTES.iter().find(|r| r.name == name)
}

/// A navigation target matched against the route table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoute {
    pub name: RouteName,
    pub path: String,
    /// Path plus query string, as it would be passed back in a `redirect`.
    pub full_path: String,
    pub params: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub meta: RouteMeta,
    pub redirected_from: Option<String>,
}

pub(crate) fn parse_location(target: &str) -> Option<Url> {
    Url::parse(APP_ORIGIN).ok()?.join(target).ok()
}

pub(crate) fn relative_location(url: &Url) -> String {
    url[Position::BeforePath..Position::AfterQuery].to_string()
}

pub fn resolve(target: &str) -> ResolvedRoute {
    let mut url = match parse_location(target) {
        Some(url) => url,
        None => {
            warn!("🧭 Unparseable navigation target '{}'", target);
            return not_found(target);
        }
    };

    let mut redirected_from = None;
    if url.path() == "/" {
        redirected_from = Some(relative_location(&url));
        url.set_path(ROOT_REDIRECT);
    }

    let path = url.path().to_string();
    let query = url.query_pairs().into_owned().collect();
    let full_path = relative_location(&url);

    for def in ROUTES.iter() {
        if let Some(params) = match_pattern(def.pattern, &path) {
            return ResolvedRoute {
                name: def.name,
                path,
                full_path,
                params,
                query,
                meta: def.meta,
                redirected_from,
            };
        }
    }

    not_found(target)
}

fn not_found(target: &str) -> ResolvedRoute {
    let meta = ROUTES[ROUTES.len() - 1].meta;
    ResolvedRoute {
        name: RouteName::NotFound,
        path: target.to_string(),
        full_path: target.to_string(),
        params: HashMap::from([(CATCH_ALL_PARAM.to_string(), target.to_string())]),
        query: Vec::new(),
        meta,
        redirected_from: None,
    }
}

fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if pattern.starts_with("/:pathMatch") {
        return Some(HashMap::from([(CATCH_ALL_PARAM.to_string(), path_segments.join("/"))]));
    }

    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    if pattern_segments.len() != path_segments.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (expected, actual) in pattern_segments.iter().zip(path_segments.iter()) {
        match expected.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), actual.to_string());
            }
            None if expected == actual => {}
            None => return None,
        }
    }
    Some(params)
}

pub fn is_admin_route(path: &str) -> bool {
    path.starts_with("/admin")
}

pub fn admin_tab(route: &ResolvedRoute) -> &'static str {
    route.meta.admin_tab.unwrap_or("overview")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreadcrumbItem {
    pub name: String,
    pub path: String,
    pub active: bool,
}

pub fn build_breadcrumb(path: &str) -> Vec<BreadcrumbItem> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            let mut chars = segment.chars();
            let name = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            };
            BreadcrumbItem {
                name,
                path: format!("/{}", segments[..=index].join("/")),
                active: index == segments.len() - 1,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub name: &'static str,
    pub path: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

pub fn navigation_items(role: Role) -> Vec<NavItem> {
    let item = |name, path, icon, description| NavItem { name, path, icon, description };

    let mut items = vec![
        item("Dashboard", "/dashboard", "📊", "Overview and analytics"),
        item("Invest & Divest", "/invest", "💰", "Buy and sell fund tokens"),
        item("Portfolio", "/portfolio", "📈", "Holdings and allocation"),
        item("Dividends", "/dividends", "💎", "Dividend preferences and history"),
        item("Trading Bots", "/trading-bots", "🤖", "Automated trading strategies"),
        item("Transactions", "/transactions", "📋", "Transaction history"),
    ];

    if role == Role::Manager {
        items.push(item("Administration", "/admin", "⚙️", "Fund management and settings"));
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_routes_resolve() {
        let route = resolve("/portfolio");
        assert_eq!(route.name, RouteName::Portfolio);
        assert!(route.meta.requires_auth);
        assert_eq!(route.meta.title, "Portfolio - Tesseract Fund");
    }

    #[test]
    fn test_root_redirects_to_dashboard() {
        let route = resolve("/");
        assert_eq!(route.name, RouteName::Dashboard);
        assert_eq!(route.path, "/dashboard");
        assert_eq!(route.redirected_from.as_deref(), Some("/"));
    }

    #[test]
    fn test_params_and_query_are_captured() {
        let route = resolve("/bots/bot_004/configure?tab=risk");
        assert_eq!(route.name, RouteName::BotConfigure);
        assert_eq!(route.params["id"], "bot_004");
        assert_eq!(route.query, vec![("tab".to_string(), "risk".to_string())]);
        assert_eq!(route.full_path, "/bots/bot_004/configure?tab=risk");
        assert!(route.meta.requires_manager);

        assert_eq!(resolve("/transactions/tx_001").name, RouteName::TransactionDetail);
        assert_eq!(resolve("/transactions").name, RouteName::Transactions);
    }

    #[test]
    fn test_unknown_paths_hit_catch_all() {
        let route = resolve("/does/not/exist");
        assert_eq!(route.name, RouteName::NotFound);
        assert_eq!(route.params[CATCH_ALL_PARAM], "does/not/exist");
        assert!(route.meta.hide_navigation);
        assert!(!route.meta.requires_auth);
    }

    #[test]
    fn test_admin_helpers() {
        assert!(is_admin_route("/admin/system"));
        assert!(!is_admin_route("/dashboard"));

        assert_eq!(admin_tab(&resolve("/admin/investors")), "investors");
        assert_eq!(admin_tab(&resolve("/admin")), "overview");
    }

    #[test]
    fn test_breadcrumb() {
        let crumbs = build_breadcrumb("/admin/dividends");
        assert_eq!(
            crumbs,
            vec![
                BreadcrumbItem { name: "Admin".to_string(), path: "/admin".to_string(), active: false },
                BreadcrumbItem { name: "Dividends".to_string(), path: "/admin/dividends".to_string(), active: true },
            ]
        );
        assert!(build_breadcrumb("/").is_empty());
    }

    #[test]
    fn test_navigation_items_by_role() {
        assert_eq!(navigation_items(Role::Investor).len(), 6);

        let manager = navigation_items(Role::Manager);
        assert_eq!(manager.len(), 7);
        assert_eq!(manager[6].path, "/admin");
    }

    #[test]
    fn test_route_names_are_unique() {
        for def in route_table() {
            assert_eq!(route_by_name(def.name).map(|r| r.pattern), Some(def.pattern));
        }
    }
}
