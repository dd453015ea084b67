#![forbid(unsafe_code)]
//! Wire contract for the Lugline HTTP API.
//!
//! Everything a client sees lives here: the error envelope, request bodies,
//! response shapes, and query-parameter parsing. Handlers stay thin by
//! borrowing all shapes from this crate.

pub mod errors;
pub mod params;
pub mod requests;
pub mod responses;

pub use errors::{ApiError, ApiErrorCode};
pub use params::{
    parse_delivery_filters, parse_page_params, parse_user_filters, DeliveryFilters, PageParams,
    UserFilters, MAX_PAGE_LIMIT,
};
pub use requests::{
    AssignDeliveryRequest, AvailabilityRequest, CreateDeliveryRequest, DriverInfoRequest,
    LassyRequest, LocationUpdateRequest, LoginRequest, RegisterRequest, StatusUpdateRequest,
    UserStatusRequest,
};
pub use responses::{
    AssistantResponse, AuthResponse, DashboardResponse, DashboardStats, DeliveryListResponse,
    DeliveryResponse, DeliveryView, DriverStats, DriverStatsResponse, MessageResponse,
    NotificationListResponse, SuggestionsResponse, UserListResponse, UserSummary,
};

pub const CRATE_NAME: &str = "lugline-api";
