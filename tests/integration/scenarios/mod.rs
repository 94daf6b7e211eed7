mod command_flow;
mod fastest_run;
mod mode_switch;
mod reconnect;
mod sensors;
