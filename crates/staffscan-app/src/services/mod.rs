// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — wires configuration, the data directory and the pipeline
// together for the command-line front end.

pub mod data_dir;
pub mod scan_service;
