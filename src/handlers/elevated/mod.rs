// handlers/elevated/mod.rs - Tenant administration
//
// Route Prefix: /api/root/*
// Middleware: tenant resolution, then `require_public_host`; these routes
// never run inside a tenant namespace.
pub mod root;
