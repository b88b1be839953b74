//! SQL schema definitions.

/// Complete schema for the Bursar v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Wallets & Ledger
-- ============================================================

CREATE TABLE IF NOT EXISTS wallets (
    id INTEGER PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE,
    balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
    total_funded INTEGER NOT NULL DEFAULT 0,
    total_spent INTEGER NOT NULL DEFAULT 0,
    total_earned INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS wallet_transactions (
    id INTEGER PRIMARY KEY,
    wallet_id INTEGER NOT NULL REFERENCES wallets(id),
    kind TEXT NOT NULL CHECK (kind IN ('credit', 'debit')),
    amount INTEGER NOT NULL CHECK (amount > 0),
    description TEXT NOT NULL,
    reference TEXT UNIQUE,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_wallet_tx_wallet ON wallet_transactions(wallet_id);

-- ============================================================
-- Partners & Referrals
-- ============================================================

CREATE TABLE IF NOT EXISTS partners (
    id INTEGER PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE,
    partner_code TEXT NOT NULL UNIQUE COLLATE NOCASE,
    business_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'inactive', 'suspended')),
    commission_rate_pct INTEGER NOT NULL
        CHECK (commission_rate_pct BETWEEN 0 AND 100),
    pending_earnings INTEGER NOT NULL DEFAULT 0 CHECK (pending_earnings >= 0),
    paid_earnings INTEGER NOT NULL DEFAULT 0,
    bank_name TEXT,
    account_number TEXT,
    account_name TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS referrals (
    id INTEGER PRIMARY KEY,
    partner_id INTEGER NOT NULL REFERENCES partners(id),
    lecturer_id TEXT NOT NULL UNIQUE,
    referral_code TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'inactive')),
    total_submissions INTEGER NOT NULL DEFAULT 0,
    total_revenue INTEGER NOT NULL DEFAULT 0,
    partner_earnings INTEGER NOT NULL DEFAULT 0,
    first_submission_at INTEGER,
    last_submission_at INTEGER,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_referrals_partner ON referrals(partner_id);

CREATE TABLE IF NOT EXISTS partner_earnings (
    id INTEGER PRIMARY KEY,
    partner_id INTEGER NOT NULL REFERENCES partners(id),
    referral_id INTEGER NOT NULL REFERENCES referrals(id),
    transaction_id INTEGER REFERENCES wallet_transactions(id),
    source_type TEXT NOT NULL
        CHECK (source_type IN ('assignment_submission', 'test_submission')),
    source_id TEXT NOT NULL,
    source_amount INTEGER NOT NULL,
    lecturer_amount INTEGER NOT NULL,
    commission_rate_pct INTEGER NOT NULL,
    amount INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'paid', 'withdrawn')),
    withdrawal_id INTEGER,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_earnings_partner ON partner_earnings(partner_id);
CREATE INDEX IF NOT EXISTS idx_earnings_referral ON partner_earnings(referral_id);
CREATE INDEX IF NOT EXISTS idx_earnings_pending
    ON partner_earnings(partner_id, status) WHERE status = 'pending';

-- ============================================================
-- Withdrawals
-- ============================================================

CREATE TABLE IF NOT EXISTS withdrawal_requests (
    id INTEGER PRIMARY KEY,
    requester_type TEXT NOT NULL CHECK (requester_type IN ('partner', 'lecturer')),
    requester_id TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount > 0),
    bank_name TEXT NOT NULL,
    account_number TEXT NOT NULL,
    account_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'approved', 'rejected', 'paid')),
    requested_at INTEGER NOT NULL,
    reviewed_at INTEGER,
    reviewed_by TEXT,
    review_note TEXT,
    paid_at INTEGER,
    paid_by TEXT,
    payment_reference TEXT
);

CREATE INDEX IF NOT EXISTS idx_withdrawals_requester
    ON withdrawal_requests(requester_type, requester_id);
CREATE INDEX IF NOT EXISTS idx_withdrawals_status ON withdrawal_requests(status);

-- ============================================================
-- Platform revenue (reporting only, no wallet)
-- ============================================================

CREATE TABLE IF NOT EXISTS platform_revenue (
    id INTEGER PRIMARY KEY,
    source_type TEXT NOT NULL,
    source_id TEXT NOT NULL,
    amount INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);
"#;
