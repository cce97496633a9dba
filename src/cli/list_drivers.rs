// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! List the SoapySDR drivers of attached devices.

use log::{info, warn};

use crate::{source::list_drivers, RadiolineError};

pub(super) fn run() -> Result<(), RadiolineError> {
    let drivers = list_drivers()?;
    if drivers.is_empty() {
        warn!("No SDR devices were found");
    } else {
        info!("Drivers of attached devices:");
        for driver in drivers {
            info!("  {driver}");
        }
    }
    Ok(())
}
