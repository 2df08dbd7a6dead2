pub mod guard;
pub mod routes;

pub use guard::{check_access, Navigation, NavigationGuard};
pub use routes::{
    admin_tab, build_breadcrumb, is_admin_route, navigation_items, resolve, route_table, BreadcrumbItem, NavItem,
    ResolvedRoute, RouteMeta, RouteName,
};
