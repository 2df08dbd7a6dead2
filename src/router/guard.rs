use log::{debug, info};
use std::sync::Arc;

use super::routes::{self, ResolvedRoute, RouteName};
use crate::store::SessionStore;

/// Outcome of running the guard for one navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    Proceed(ResolvedRoute),
    Redirect {
        to: RouteName,
        /// Full path of the blocked target, carried to the login page.
        redirect: Option<String>,
        location: String,
    },
}

impl Navigation {
    /// Page title of the route navigation lands on.
    pub fn title(&self) -> Option<&'static str> {
        match self {
            Navigation::Proceed(route) => Some(route.meta.title),
            Navigation::Redirect { to, .. } => routes::route_by_name(*to).map(|r| r.meta.title),
        }
    }
}

pub struct NavigationGuard {
    session: Arc<SessionStore>,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    pub async fn before_each(&self, target: &str) -> Navigation {
        let route = routes::resolve(target);
        let session = self.session.snapshot().await;
        let outcome = check_access(route, session.is_authenticated(), session.is_manager());

        match &outcome {
            Navigation::Proceed(route) => debug!("🧭 {} -> {}", target, route.name),
            Navigation::Redirect { location, .. } => info!("🧭 {} redirected to {}", target, location),
        }
        outcome
    }
}

pub fn check_access(route: ResolvedRoute, authenticated: bool, manager: bool) -> Navigation {
    if route.meta.requires_auth {
        if !authenticated {
            return redirect(RouteName::Login, Some(route.full_path));
        }
        if route.meta.requires_manager && !manager {
            return redirect(RouteName::Unauthorized, None);
        }
    }

    if route.meta.requires_guest && authenticated {
        return redirect(RouteName::Dashboard, None);
    }

    Navigation::Proceed(route)
}

fn redirect(to: RouteName, return_to: Option<String>) -> Navigation {
    let path = routes::route_by_name(to).map(|r| r.pattern).unwrap_or("/");
    let location = match routes::parse_location(path) {
        Some(mut url) => {
            if let Some(return_to) = &return_to {
                url.query_pairs_mut().append_pair("redirect", return_to);
            }
            routes::relative_location(&url)
        }
        None => path.to_string(),
    };

    Navigation::Redirect {
        to,
        redirect: return_to,
        location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::WalletProvider;
    use crate::sim::ScriptedRandom;
    use crate::store::Environment;

    fn guard_with(env: Environment) -> (Arc<SessionStore>, NavigationGuard) {
        let session = Arc::new(SessionStore::new(&Config::without_latency(), env));
        let guard = NavigationGuard::new(session.clone());
        (session, guard)
    }

    #[tokio::test]
    async fn test_signed_out_users_are_sent_to_login() {
        let (_, guard) = guard_with(Environment::in_memory());

        let outcome = guard.before_each("/transactions?type=invest").await;
        assert_eq!(
            outcome,
            Navigation::Redirect {
                to: RouteName::Login,
                redirect: Some("/transactions?type=invest".to_string()),
                location: "/login?redirect=%2Ftransactions%3Ftype%3Dinvest".to_string(),
            }
        );
        assert_eq!(outcome.title(), Some("Login - Tesseract Fund"));
    }

    #[tokio::test]
    async fn test_root_redirect_then_login() {
        let (_, guard) = guard_with(Environment::in_memory());

        match guard.before_each("/").await {
            Navigation::Redirect { to, redirect, .. } => {
                assert_eq!(to, RouteName::Login);
                assert_eq!(redirect.as_deref(), Some("/dashboard"));
            }
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_investors_cannot_reach_manager_routes() {
        let (session, guard) = guard_with(Environment::in_memory());
        session.connect(WalletProvider::Metamask).await.unwrap();
        assert!(!session.is_manager().await);

        let outcome = guard.before_each("/admin").await;
        assert!(matches!(outcome, Navigation::Redirect { to: RouteName::Unauthorized, redirect: None, .. }));

        let outcome = guard.before_each("/bots/bot_001").await;
        assert!(matches!(outcome, Navigation::Proceed(ref r) if r.name == RouteName::BotDetail));
    }

    #[tokio::test]
    async fn test_managers_reach_admin() {
        // Every hex digit draws as '1', so the address ends in 1.
        let env = Environment {
            random: Arc::new(ScriptedRandom::constant(0.07)),
            ..Environment::in_memory()
        };
        let (session, guard) = guard_with(env);
        session.connect(WalletProvider::Coinbase).await.unwrap();
        assert!(session.is_manager().await);

        let outcome = guard.before_each("/admin/system").await;
        assert_eq!(outcome.title(), Some("System Settings - Admin"));
        assert!(matches!(outcome, Navigation::Proceed(_)));
    }

    #[tokio::test]
    async fn test_signed_in_users_skip_guest_pages() {
        let (session, guard) = guard_with(Environment::in_memory());
        session.connect(WalletProvider::WalletConnect).await.unwrap();

        let outcome = guard.before_each("/login").await;
        assert!(matches!(outcome, Navigation::Redirect { to: RouteName::Dashboard, .. }));
    }

    #[test]
    fn test_public_routes_always_proceed() {
        for path in ["/unauthorized", "/nowhere", "/login"] {
            let outcome = check_access(routes::resolve(path), false, false);
            assert!(matches!(outcome, Navigation::Proceed(_)), "{} should proceed", path);
        }
    }
}
