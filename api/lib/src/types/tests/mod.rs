// Copyright (C) Microsoft Corporation. All rights reserved.

#[cfg(test)]
mod algo_tests;
#[cfg(test)]
mod key_props_tests;
