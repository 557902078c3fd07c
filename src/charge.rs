use crate::models::battery::Battery;

/// What happened during one dispatched hour, all values in kWh and non-negative
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct DispatchOutcome {
    pub charged: f64,
    pub discharged: f64,
    pub level_after: f64,
    pub grid_purchase: f64,
    pub grid_surplus: f64,
}

/// Hour by hour battery dispatcher.
///
/// The policy is greedy self consumption: every surplus is stored as long as there is room and
/// power, every deficit is covered from the battery as long as there is charge. It never charges
/// from the grid and never holds back charge for more expensive hours, it is not an optimizer.
/// All round trip losses are taken when charging.
pub struct Dispatcher<'a> {
    battery: Option<&'a Battery>,
    level_kwh: f64,
}

impl<'a> Dispatcher<'a> {
    /// Returns a new dispatcher with an empty battery, or a pass-through dispatcher if there is no
    /// battery
    ///
    /// # Arguments
    ///
    /// * 'battery' - the battery to dispatch, if any
    pub fn new(battery: Option<&'a Battery>) -> Dispatcher<'a> {
        Dispatcher { battery, level_kwh: 0.0 }
    }

    /// Current battery level in kWh
    pub fn level(&self) -> f64 {
        self.level_kwh
    }

    /// Dispatches one hour
    ///
    /// # Arguments
    ///
    /// * 'consumption' - household consumption during the hour in kWh
    /// * 'production' - PV production during the hour in kWh
    pub fn dispatch(&mut self, consumption: f64, production: f64) -> DispatchOutcome {
        let mut net = consumption - production;
        let mut charged = 0.0;
        let mut discharged = 0.0;

        if let Some(battery) = self.battery {
            let max_kwh = battery.max_power_kw();

            if net > 0.0 {
                discharged = self.level_kwh.min(max_kwh).min(net).max(0.0);
                self.level_kwh -= discharged;
                net -= discharged;
            } else if net < 0.0 {
                let efficiency = battery.efficiency();
                if efficiency > 0.0 {
                    let room = ((battery.capacity_kwh - self.level_kwh) / efficiency).max(0.0);
                    charged = room.min(max_kwh).min(-net);
                    self.level_kwh = (self.level_kwh + charged * efficiency).min(battery.capacity_kwh);
                    net += charged;
                }
            }
        }

        DispatchOutcome {
            charged,
            discharged,
            level_after: self.level_kwh,
            grid_purchase: net.max(0.0),
            grid_surplus: (-net).max(0.0),
        }
    }
}
