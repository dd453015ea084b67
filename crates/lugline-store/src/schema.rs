//! Schema creation.
//!
//! Documents keep their nested parts (locations, items, tracking, rating,
//! driver profile) as JSON text columns; everything queries filter or sort on
//! is a real column. Timestamps are Unix milliseconds throughout.

/// SQL statements for creating the database schema.
pub const CREATE_TABLES_SQL: &str = r"
-- Accounts
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    phone TEXT,
    address TEXT NOT NULL DEFAULT '',
    avatar TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    -- JSON profile for drivers, NULL otherwise; availability is mirrored
    -- into driver_available so the matching query stays a plain WHERE.
    driver_profile TEXT,
    driver_available INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
CREATE INDEX IF NOT EXISTS idx_users_role_available ON users(role, driver_available);

-- Opaque bearer sessions
CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);

-- Delivery documents
CREATE TABLE IF NOT EXISTS deliveries (
    id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL REFERENCES users(id),
    driver_id TEXT REFERENCES users(id),
    pickup_location TEXT NOT NULL,
    drop_location TEXT NOT NULL,
    items TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'pending',
    priority TEXT NOT NULL DEFAULT 'medium',
    priority_rank INTEGER NOT NULL DEFAULT 1,
    scheduled_pickup INTEGER NOT NULL,
    estimated_delivery INTEGER,
    actual_pickup_time INTEGER,
    actual_delivery_time INTEGER,
    delivery_fee REAL NOT NULL,
    distance REAL NOT NULL,
    estimated_duration INTEGER,
    tracking TEXT NOT NULL DEFAULT '[]',
    rating TEXT NOT NULL DEFAULT '{}',
    payment_status TEXT NOT NULL DEFAULT 'pending',
    auto_assigned_at INTEGER,
    is_urgent INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_deliveries_status ON deliveries(status);
CREATE INDEX IF NOT EXISTS idx_deliveries_customer ON deliveries(customer_id, created_at);
CREATE INDEX IF NOT EXISTS idx_deliveries_driver ON deliveries(driver_id, created_at);
CREATE INDEX IF NOT EXISTS idx_deliveries_created ON deliveries(created_at);
CREATE INDEX IF NOT EXISTS idx_deliveries_open ON deliveries(status, driver_id, created_at);

-- Bell-dropdown notifications
CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    recipient_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    kind TEXT NOT NULL,
    priority TEXT,
    data TEXT NOT NULL DEFAULT '{}',
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, created_at);
CREATE INDEX IF NOT EXISTS idx_notifications_read_created ON notifications(is_read, created_at);
";
